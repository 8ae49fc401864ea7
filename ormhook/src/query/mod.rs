//! Query construction: row filters, structured selects and raw SQL.

mod filter;
mod raw;
mod select;

pub use filter::*;
pub use raw::*;
pub use select::*;
