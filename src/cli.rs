//! CLI definitions for dynsched.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// dynsched CLI.
#[derive(Parser)]
#[command(name = "dynsched")]
#[command(about = "Declarative job scheduler driven by an external config store")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.dynsched/config.toml)
    #[arg(short, long, global = true, env = "DYNSCHED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler in foreground until Ctrl-C (default)
    Run,

    /// Edit the schedule values in the SQLite store
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Resolve every job against the current store contents
    Check {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Insert or replace a value
    Set {
        /// Config key (e.g. job1_cron)
        key: String,

        /// New value
        value: String,
    },

    /// Delete a value
    Unset {
        /// Config key
        key: String,
    },

    /// List every stored value
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["dynsched"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_config_set_parses() {
        let cli = Cli::try_parse_from(["dynsched", "config", "set", "job1_cron", "*/5 * * * * *"])
            .unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Set { key, value },
            }) => {
                assert_eq!(key, "job1_cron");
                assert_eq!(value, "*/5 * * * * *");
            }
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["dynsched", "check", "--format", "json", "-c", "/tmp/d.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/d.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Check {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["dynsched", "check", "--format", "yaml"]).is_err());
    }
}
