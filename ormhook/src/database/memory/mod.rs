//! In-memory reference backend.
//!
//! Keeps every table in a concurrent skip list keyed by primary key. It is meant for tests
//! and demos: there is no persistence, no transactions and only a tiny raw SQL dialect.

mod database;
mod module;

pub use database::*;
pub use module::*;
