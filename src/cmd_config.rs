//! Config subcommand handlers for dynsched.

use dynsched_config::{SourceConfig, SourceKind};
use tracing::{info, warn};

use crate::cli::{ConfigAction, OutputFormat};
use crate::source::open_sqlite;

/// Handle config subcommands.
pub(crate) async fn handle_config_command(
    action: ConfigAction,
    config: &SourceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.kind != SourceKind::Sqlite {
        warn!("source.kind is not sqlite; editing {} anyway", config.path);
    }
    let store = open_sqlite(config).await?;

    match action {
        ConfigAction::Set { key, value } => {
            store.set(&key, &value).await?;
            info!(key = %key, "Value stored");
            println!("{} = {}", key, value);
        }
        ConfigAction::Unset { key } => {
            if store.remove(&key).await? {
                println!("Removed {}", key);
            } else {
                println!("{} was not set", key);
            }
        }
        ConfigAction::List { format } => {
            let rows = store.list().await?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = rows
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
                OutputFormat::Table => {
                    if rows.is_empty() {
                        println!("No values stored.");
                        return Ok(());
                    }
                    println!("{:<30} {}", "KEY", "VALUE");
                    println!("{}", "-".repeat(60));
                    for (key, value) in rows {
                        println!("{:<30} {}", key, value);
                    }
                }
            }
        }
    }

    Ok(())
}
