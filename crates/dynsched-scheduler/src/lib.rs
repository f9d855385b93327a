//! # dynsched Scheduler
//!
//! Declarative job scheduling whose schedules live in an external config
//! store and can change at runtime.
//!
//! ## Architecture
//!
//! ```text
//! JobProvider ──record──▶ JobRegistry ──┐
//!                                       ▼
//! ConfigSource ◀─poll── ConfigWatcher ─change─▶ ReconciliationController
//!                            │ snapshot              │ cancel_all / resolve / register_all
//!                            └───────────────────────▼
//!                                             TaskRegistrar ──▶ Executor
//! ```
//!
//! - [`resolver`] turns declared attributes plus a snapshot into a [`Trigger`](dynsched_protocols::Trigger)
//! - [`ConfigWatcher`] polls the source and raises one coalesced event per changed tick
//! - [`JobRegistry`] remembers every declaration for the life of the process
//! - [`TaskRegistrar`] owns the live tasks
//! - [`ReconciliationController`] swaps the whole live set on every change
//! - [`DynamicScheduler`] wires them together behind a two-phase boot

pub mod error;
pub mod executor;
pub mod reconciler;
pub mod registrar;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod source;
pub mod watcher;

pub use error::{SchedulerError, SchedulerResult};
pub use executor::TokioExecutor;
pub use reconciler::{ReconcileReport, ReconciliationController, SkippedJob};
pub use registrar::{LiveTask, LiveTaskInfo, RegistrationReport, TaskRegistrar};
pub use registry::JobRegistry;
pub use resolver::{parse_enable, resolve};
pub use scheduler::{DynamicScheduler, DynamicSchedulerBuilder, SchedulerStatus};
pub use source::MemoryConfigSource;
pub use watcher::ConfigWatcher;
