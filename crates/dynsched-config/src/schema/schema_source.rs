//! Config source selection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Backend the dynamic schedule values are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `data_config` table in a SQLite database.
    #[default]
    Sqlite,
    /// In-process map seeded from `values`.
    Memory,
}

/// Config source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// SQLite database path (`~` is expanded).
    #[serde(default = "default_source_path")]
    pub path: String,

    /// Table holding `config_key` / `config_value` rows.
    #[serde(default = "default_table")]
    pub table: String,

    /// Initial values for the memory source.
    #[serde(default)]
    pub values: HashMap<String, String>,
}

fn default_source_path() -> String {
    "~/.dynsched/config.db".to_string()
}

fn default_table() -> String {
    "data_config".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: default_source_path(),
            table: default_table(),
            values: HashMap::new(),
        }
    }
}
