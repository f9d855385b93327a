//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Create the config table if it does not exist.
///
/// `table` must already have passed [`is_valid_table_name`].
pub fn init_schema(conn: &Connection, table: &str) -> Result<(), Error> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            config_key TEXT PRIMARY KEY NOT NULL,
            config_value TEXT
        );"
    ))?;
    Ok(())
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn is_valid_table_name(table: &str) -> bool {
    let mut chars = table.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
