//! Host database boundary: the provider trait, replica rotation, connection URLs and the
//! in-memory reference backend.

mod database;
pub mod memory;
mod module;
mod replica;
mod url;

pub use database::*;
pub use module::*;
pub use replica::*;
pub use url::*;
