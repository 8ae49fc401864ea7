mod type_utils;

pub use type_utils::*;
