//! SQLite config source implementation.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::params;
use tokio_rusqlite::Connection;
use tracing::debug;

use dynsched_protocols::{ConfigSource, SourceError};

use crate::schema::{init_schema, is_valid_table_name};

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;

/// Default table name.
pub const DEFAULT_TABLE: &str = "data_config";

/// Config source reading `config_key` / `config_value` rows from SQLite.
pub struct SqliteConfigSource {
    conn: Connection,
    table: String,
}

impl SqliteConfigSource {
    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, SourceError> {
        check_table(table)?;
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(&path)
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        debug!(path = %path.display(), table, "Opened SQLite config source");
        Self::init(conn, table).await
    }

    /// Create an in-memory database.
    pub async fn in_memory(table: &str) -> Result<Self, SourceError> {
        check_table(table)?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Self::init(conn, table).await
    }

    async fn init(conn: Connection, table: &str) -> Result<Self, SourceError> {
        let t = table.to_string();
        conn.call(move |conn| init_schema(conn, &t))
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;

        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Insert or replace a value.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), SourceError> {
        let sql = format!(
            "INSERT INTO {} (config_key, config_value) VALUES (?1, ?2)
             ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value",
            self.table
        );
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(&sql, params![key, value])?;
                Ok(())
            })
            .await
            .map_err(|e| SourceError::Query(e.to_string()))
    }

    /// Delete a key. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> Result<bool, SourceError> {
        let sql = format!("DELETE FROM {} WHERE config_key = ?1", self.table);
        let key = key.to_string();
        self.conn
            .call(move |conn| Ok(conn.execute(&sql, [&key])? > 0))
            .await
            .map_err(|e| SourceError::Query(e.to_string()))
    }

    /// Every row, ordered by key.
    pub async fn list(&self) -> Result<Vec<(String, String)>, SourceError> {
        let sql = format!(
            "SELECT config_key, config_value FROM {} ORDER BY config_key",
            self.table
        );
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        let key: String = row.get(0)?;
                        let value: Option<String> = row.get(1)?;
                        Ok((key, value.unwrap_or_default()))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(|e| SourceError::Query(e.to_string()))
    }
}

#[async_trait]
impl ConfigSource for SqliteConfigSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_all(&self) -> Result<HashMap<String, String>, SourceError> {
        // NULL values read as empty, which the resolver treats as unset.
        Ok(self.list().await?.into_iter().collect())
    }
}

fn check_table(table: &str) -> Result<(), SourceError> {
    if is_valid_table_name(table) {
        Ok(())
    } else {
        Err(SourceError::Query(format!("invalid table name '{table}'")))
    }
}
