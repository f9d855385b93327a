//! Immutable config snapshots and change events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Point-in-time copy of every key/value pair in the config store.
///
/// Snapshots are published by replacement and never mutated, so a reader
/// always sees one complete fetch.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    values: HashMap<String, String>,
    version: u64,
    fetched_at: Option<DateTime<Utc>>,
}

impl ConfigSnapshot {
    /// The empty snapshot published before the first fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(values: HashMap<String, String>, version: u64) -> Self {
        Self {
            values,
            version,
            fetched_at: Some(Utc::now()),
        }
    }

    /// Raw value for `key`, empty strings included.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key` only when it is present and non-empty.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            0,
        )
    }
}

/// Raised once per watcher tick that observed at least one changed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    /// Version of the snapshot that carries the change.
    pub version: u64,
    /// Keys whose non-empty value changed during the tick, sorted.
    pub changed_keys: Vec<String>,
}
