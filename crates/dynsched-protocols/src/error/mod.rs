//! Error types for the dynsched protocol layer.

mod executor;
mod source;
mod validation;

pub use executor::*;
pub use source::*;
pub use validation::*;
