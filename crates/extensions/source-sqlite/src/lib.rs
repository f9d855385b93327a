//! SQLite config source for dynsched.
//!
//! Reads schedule values from a two-column `config_key` / `config_value`
//! table (`data_config` by default) and offers helpers to edit it.

mod schema;
mod source;

pub use source::{DEFAULT_TABLE, SqliteConfigSource};
