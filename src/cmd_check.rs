//! `check` subcommand: resolve every job without scheduling anything.

use std::sync::Arc;

use serde::Serialize;

use dynsched_config::SourceConfig;
use dynsched_protocols::{ConfigSnapshot, JobDeclaration, JobProvider};
use dynsched_scheduler::resolve;

use crate::cli::OutputFormat;
use crate::jobs::CustomerTask;
use crate::source::build_source;

/// Resolution outcome for one job.
#[derive(Debug, Serialize)]
pub(crate) struct CheckRow {
    pub job: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub(crate) fn check_declarations(
    declarations: &[JobDeclaration],
    snapshot: &ConfigSnapshot,
) -> Vec<CheckRow> {
    declarations
        .iter()
        .map(|decl| match resolve(decl, snapshot) {
            Ok(resolved) => CheckRow {
                job: decl.id.to_string(),
                status: if resolved.enabled { "scheduled" } else { "disabled" },
                trigger: Some(resolved.trigger.to_string()),
                error: None,
            },
            Err(e) => CheckRow {
                job: decl.id.to_string(),
                status: "invalid",
                trigger: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Handle the check command.
pub(crate) async fn handle_check_command(
    format: OutputFormat,
    config: &SourceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = build_source(config).await?;
    let values = source.fetch_all().await?;
    let snapshot = ConfigSnapshot::new(values, 1);

    let declarations = Arc::new(CustomerTask::new()).declarations();
    let rows = check_declarations(&declarations, &snapshot);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            println!("{:<26} {:<10} {}", "JOB", "STATUS", "SCHEDULE");
            println!("{}", "-".repeat(80));
            for row in &rows {
                let detail = row
                    .trigger
                    .as_deref()
                    .or(row.error.as_deref())
                    .unwrap_or_default();
                println!("{:<26} {:<10} {}", row.job, row.status, detail);
            }
        }
    }

    if rows.iter().any(|r| r.error.is_some()) {
        return Err("one or more jobs failed to resolve".into());
    }
    Ok(())
}
