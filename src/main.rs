//! dynsched - Declarative job scheduler
//!
//! Main entry point for the dynsched CLI and scheduler process.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dynsched_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use dynsched_scheduler::DynamicScheduler;

mod cli;
mod cmd_check;
mod cmd_config;
mod jobs;
mod source;

use cli::{Cli, Commands};
use cmd_check::handle_check_command;
use cmd_config::handle_config_command;
use jobs::CustomerTask;

/// Initialize tracing with console and optional file output.
///
/// `RUST_LOG` wins over the configured level. Files are rotated daily.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    let file_layer = match &logging.dir {
        Some(dir) => {
            let log_dir = ConfigLoader::expand_path(dir);
            std::fs::create_dir_all(&log_dir)?;

            let mut builder = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("dynsched")
                .filename_suffix("log");
            if logging.max_files > 0 {
                builder = builder.max_log_files(logging.max_files);
            }
            let file_appender = builder.build(&log_dir)?;

            // The guard flushes on drop, so it must live for the whole process.
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Load and validate the configuration file.
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => ConfigLoader::load_or_default(&ConfigLoader::default_path())?,
    };
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config)?;
    for warning in &result.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !result.is_valid() {
        for err in &result.errors {
            error!(path = %err.path, "{}", err.message);
        }
        return Err(format!("invalid configuration ({} error(s))", result.errors.len()).into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.logging)?;
    validate_config(&config)?;

    match cli.command {
        None | Some(Commands::Run) => run_scheduler(config).await,
        Some(Commands::Config { action }) => handle_config_command(action, &config.source).await,
        Some(Commands::Check { format }) => handle_check_command(format, &config.source).await,
    }
}

/// Run the scheduler in foreground until Ctrl-C.
async fn run_scheduler(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting dynsched v{}", env!("CARGO_PKG_VERSION"));

    let source = source::build_source(&config.source).await?;
    let scheduler = DynamicScheduler::builder(source)
        .config(config.scheduler.clone())
        .build();

    let recorded = scheduler.discover(Arc::new(CustomerTask::new()));
    info!(jobs = recorded, "Jobs recorded");

    let report = scheduler.start().await?;
    info!(
        scheduled = report.registration.scheduled,
        disabled = report.registration.disabled,
        skipped = report.skipped.len(),
        watch_interval_secs = config.scheduler.watch_interval_secs,
        "Scheduler started, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");

    scheduler.shutdown().await;
    info!("Scheduler stopped");
    Ok(())
}
