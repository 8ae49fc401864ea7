#![recursion_limit = "128"]
//! # ormhook Derive Macros
//!
//! Procedural macros for implementing `ormhook` traits automatically.
//!
//! ## Macros
//!
//! ### `Model`
//!
//! Derives `ormhook::model::Model` for a struct with named fields. Every field becomes a
//! column converted through `ormhook::common::Convertible`.
//!
//! - **Struct attribute**: `#[model(table = "...")]` sets the table name (default: the
//!   struct name in snake_case)
//! - **Field attributes**:
//!   - `#[model(primary_key)]` marks the primary key (default: the field named `id`)
//!   - `#[model(column = "...")]` renames the column
//!   - `#[model(choices = "path::to::fn")]` attaches the `Choices` returned by `fn()`
//!   - `#[model(skip)]` keeps the field out of the row; it is rebuilt with `Default`
//!
//! # Examples
//!
//! ```rust,ignore
//! use ormhook::choices::Choices;
//! use ormhook_derive::Model;
//!
//! fn status_choices() -> Choices {
//!     ormhook::choices![0 => "draft", 1 => "published"]
//! }
//!
//! #[derive(Model)]
//! #[model(table = "posts")]
//! pub struct Post {
//!     pub id: Option<i64>,
//!     pub title: String,
//!     #[model(choices = "status_choices")]
//!     pub status: i64,
//!     #[model(skip)]
//!     pub cached_html: Option<String>,
//! }
//! ```

extern crate proc_macro;
mod model;

use crate::model::generate_model_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives the `Model` trait for row-backed persistence.
///
/// # Supported Types
///
/// - Structs with named fields only
/// - Enums, unions, tuple structs and unit structs are rejected
///
/// # Errors
///
/// Returns a compile error if:
/// - No primary key can be found (no `#[model(primary_key)]` and no `id` field)
/// - More than one field is marked `#[model(primary_key)]`
/// - The primary key field is skipped
/// - An attribute is unknown or malformed
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => match generate_model_for_struct(&ast, data) {
            Ok(token_stream) => token_stream,
            Err(e) => e.to_compile_error().into(),
        },
        Data::Enum(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Model for enums. Only structs with named fields are supported.",
            );
            error.to_compile_error().into()
        }
        Data::Union(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Model for unions. Only structs with named fields are supported.",
            );
            error.to_compile_error().into()
        }
    }
}
