//! Config source construction from the `[source]` table.

use std::sync::Arc;

use tracing::info;

use dynsched_config::{ConfigLoader, SourceConfig, SourceKind};
use dynsched_protocols::{ConfigSource, SourceError};
use dynsched_scheduler::MemoryConfigSource;
use dynsched_source_sqlite::SqliteConfigSource;

/// Build the source the scheduler reads schedule values from.
pub(crate) async fn build_source(config: &SourceConfig) -> Result<Arc<dyn ConfigSource>, SourceError> {
    match config.kind {
        SourceKind::Sqlite => Ok(Arc::new(open_sqlite(config).await?)),
        SourceKind::Memory => {
            info!(values = config.values.len(), "Using in-memory config source");
            Ok(Arc::new(MemoryConfigSource::with_values(
                config.values.clone(),
            )))
        }
    }
}

/// Open the SQLite store named by the config, whatever `kind` says.
pub(crate) async fn open_sqlite(config: &SourceConfig) -> Result<SqliteConfigSource, SourceError> {
    let path = ConfigLoader::expand_path(&config.path);
    let source = SqliteConfigSource::open(&path, &config.table).await?;
    info!(path = %path, table = %config.table, "Using SQLite config source");
    Ok(source)
}
