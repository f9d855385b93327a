//! # dynsched Config
//!
//! Configuration management for the dynsched scheduler: the TOML file that
//! sizes the executor, sets the watcher interval, selects the config source
//! the schedules are read from, and configures logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
