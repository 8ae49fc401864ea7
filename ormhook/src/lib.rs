//! # ormhook - lifecycle hooks and read routing for row-backed models
//!
//! `ormhook` sits between application models and a host database and adds three things:
//!
//! - **Choices**: declarative `(stored value, label)` registries for enumerated fields
//! - **Signals**: synchronous `pre_save`, `post_save`, `pre_delete` and `post_delete`
//!   notifications fired around every save and delete
//! - **Read replicas**: `select` queries (and raw statements starting with `select`) are
//!   spread round-robin over the configured replicas, writes stay on the primary
//!
//! Persistence, query planning and integrity belong to the database behind
//! [`DatabaseProvider`](database::DatabaseProvider). An in-memory provider is included for
//! tests and demos.
//!
//! ## Quick Start
//!
//! ```rust
//! use ormhook::common::{from_value, Value};
//! use ormhook::errors::OrmResult;
//! use ormhook::model::{Model, Row};
//! use ormhook::orm::Orm;
//! use ormhook::query::field;
//! use ormhook::row;
//! use ormhook::signal::SignalContext;
//!
//! struct Post {
//!     id: Option<i64>,
//!     title: String,
//! }
//!
//! impl Model for Post {
//!     fn table_name() -> String {
//!         "post".to_string()
//!     }
//!
//!     fn to_row(&self) -> OrmResult<Row> {
//!         Ok(row! { id: self.id, title: self.title.clone() })
//!     }
//!
//!     fn from_row(row: &Row) -> OrmResult<Self> {
//!         Ok(Post {
//!             id: from_value::<Option<i64>>(&row.get_or_null("id"))?,
//!             title: from_value::<String>(&row.get_or_null("title"))?,
//!         })
//!     }
//!
//!     fn pk(&self) -> Option<Value> {
//!         self.id.map(Value::from)
//!     }
//!
//!     fn set_pk(&mut self, value: Value) -> OrmResult<()> {
//!         self.id = from_value::<Option<i64>>(&value)?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> OrmResult<()> {
//! let orm = Orm::builder()
//!     .database_url("memory://blog")
//!     .read_replica_url("memory://blog-replica?replica_of=blog")
//!     .open()?;
//!
//! let posts = orm.register::<Post>()?;
//! posts.post_save().connect_fn(|post: &Post, ctx: &SignalContext| {
//!     println!("saved {} (created: {:?})", post.title, ctx.created());
//!     Ok(())
//! });
//!
//! let mut post = Post { id: None, title: "Hello".to_string() };
//! posts.save(&mut post)?;
//!
//! let found = posts.get_or_none(field("title").eq("Hello"))?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`choices`] - choice registries for enumerated fields
//! - [`common`] - values, conversions and shared utilities
//! - [`database`] - the host database boundary, replica rotation and the in-memory backend
//! - [`errors`] - error types and result definitions
//! - [`model`] - the `Model` trait, rows, model classes and the registry
//! - [`orm`] - the entry point tying configuration and registry together
//! - [`orm_builder`] / [`orm_config`] - configuration
//! - [`query`] - filters, structured selects and raw statements
//! - [`signal`] - the synchronous signal primitive

pub mod choices;
pub mod common;
pub mod database;
pub mod errors;
pub mod model;
pub mod orm;
pub mod orm_builder;
pub mod orm_config;
pub mod query;
pub mod signal;

#[cfg(test)]
mod test_fixtures;
