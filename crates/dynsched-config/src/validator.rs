//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, SourceKind};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_scheduler(config, &mut result);
        Self::validate_source(config, &mut result)?;
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if config.scheduler.watch_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "scheduler.watch_interval_secs",
                "watch_interval_secs must be greater than 0",
            ));
        }

        if config.scheduler.watch_interval_secs > 3600 {
            result.add_warning(ValidationWarning::new(
                "scheduler.watch_interval_secs",
                "watch interval is over an hour, schedule changes will be picked up slowly",
            ));
        }

        if config.scheduler.pool_size == 0 {
            result.add_error(ValidationError::new(
                "scheduler.pool_size",
                "pool_size must be greater than 0",
            ));
        }

        if config.scheduler.pool_size > 10_000 {
            result.add_warning(ValidationWarning::new(
                "scheduler.pool_size",
                "pool_size is very high (>10000)",
            ));
        }
    }

    fn validate_source(config: &Config, result: &mut ValidationResult) -> Result<(), ConfigError> {
        match config.source.kind {
            SourceKind::Sqlite => {
                if config.source.path.trim().is_empty() {
                    result.add_error(ValidationError::new(
                        "source.path",
                        "SQLite source path cannot be empty",
                    ));
                }

                // The table name is interpolated into SQL, so only plain identifiers are allowed.
                let ident = regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
                    .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
                if !ident.is_match(&config.source.table) {
                    result.add_error(ValidationError::new(
                        "source.table",
                        format!("'{}' is not a valid table name", config.source.table),
                    ));
                }
            }
            SourceKind::Memory => {
                if config.source.values.is_empty() {
                    result.add_warning(ValidationWarning::new(
                        "source.values",
                        "memory source has no values, every job will use its declared literals",
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }

        if config.logging.dir.is_some() && config.logging.max_files == 0 {
            result.add_warning(ValidationWarning::new(
                "logging.max_files",
                "max_files is 0, rotated log files will never be pruned",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
