//! In-process config source.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use dynsched_protocols::{ConfigSource, SourceError};

/// Config source backed by a concurrent in-memory map.
///
/// Used for embedding and tests; values can be edited while the scheduler
/// runs and are picked up on the next watcher tick.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    values: DashMap<String, String>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = Self::new();
        for (k, v) in values {
            source.values.insert(k.into(), v.into());
        }
        source
    }

    /// Insert or replace a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.remove(key).map(|(_, v)| v)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_all(&self) -> Result<HashMap<String, String>, SourceError> {
        Ok(self
            .values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}
