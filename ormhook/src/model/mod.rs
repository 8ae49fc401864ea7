mod field;
mod model;
mod model_class;
mod registry;
mod row;

pub use field::*;
pub use model::*;
pub use model_class::*;
pub use registry::*;
pub use row::*;
