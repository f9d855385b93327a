//! Error types for the scheduler.

use thiserror::Error;

use dynsched_protocols::{ExecutorError, JobId, SourceError, ValidationError};

/// Errors that can occur while driving the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start()` was called twice.
    #[error("Scheduler is already started")]
    AlreadyStarted,

    /// The operation needs a started scheduler.
    #[error("Scheduler is not started")]
    NotStarted,

    /// A recorded declaration failed to resolve and the boot policy is `abort`.
    #[error("Invalid schedule declaration for {job}: {source}")]
    InvalidDeclaration {
        job: JobId,
        #[source]
        source: ValidationError,
    },

    /// Validation error.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Config source error.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Executor error.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
