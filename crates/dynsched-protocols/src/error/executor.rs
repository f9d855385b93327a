//! Executor binding errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{kind} period must be greater than zero")]
    ZeroPeriod { kind: &'static str },

    #[error("Cron expression rejected by executor: {0}")]
    InvalidCron(String),

    #[error("Executor is shut down")]
    Shutdown,

    #[error("Task rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_period_names_kind() {
        let err = ExecutorError::ZeroPeriod { kind: "fixed-rate" };
        assert_eq!(err.to_string(), "fixed-rate period must be greater than zero");
    }

    #[test]
    fn test_all_variants_display() {
        let errors = vec![
            ExecutorError::ZeroPeriod { kind: "fixed-delay" },
            ExecutorError::InvalidCron("bad".to_string()),
            ExecutorError::Shutdown,
            ExecutorError::Rejected("full".to_string()),
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
