//! # dynsched Protocols
//!
//! Core protocol definitions for the dynsched scheduler.
//! Contains the data model and the collaborator interfaces - no scheduling logic.
//!
//! ## Core Traits
//!
//! - [`ConfigSource`] - Key/value store the schedule values are read from
//! - [`Executor`] - Timer and worker-pool primitive that runs the jobs
//! - [`JobProvider`] - Discovery collaborator that hands over job declarations
//!
//! ## Data Model
//!
//! - [`JobDeclaration`] - A callable plus its as-declared [`ScheduleAttributes`]
//! - [`ResolvedSchedule`] - The executable form produced by the resolver
//! - [`ConfigSnapshot`] - Immutable point-in-time copy of the config store

pub mod attributes;
pub mod error;
pub mod executor;
pub mod job;
pub mod schedule;
pub mod snapshot;
pub mod source;

pub use attributes::{ConfigValue, ScheduleAttributes};
pub use error::{ExecutorError, SourceError, ValidationError};
pub use executor::{Executor, TaskHandle, TaskState};
pub use job::{Callable, JobDeclaration, JobFuture, JobId, JobProvider};
pub use schedule::{CronZone, ResolvedSchedule, Trigger};
pub use snapshot::{ConfigChange, ConfigSnapshot};
pub use source::ConfigSource;
