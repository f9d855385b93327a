//! Schedule declaration errors.

use thiserror::Error;

/// A job declaration that can never be scheduled as written.
///
/// These stem from static mis-declaration, so they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "exactly one of 'cron', 'fixedDelay' or 'fixedRate' is required (found: {})",
        describe_found(.found)
    )]
    ExactlyOneRequired { found: Vec<&'static str> },

    #[error("'initialDelay' not supported for cron triggers")]
    InitialDelayWithCron,

    #[error("specify 'initialDelay' or 'initialDelayKey', not both")]
    ConflictingInitialDelay,

    #[error("invalid {attribute} value \"{value}\": cannot parse into milliseconds")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
    },

    #[error("invalid cron expression \"{expression}\": {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("unknown time zone \"{0}\"")]
    InvalidZone(String),
}

fn describe_found(found: &[&'static str]) -> String {
    if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    }
}
