//! Job declarations and the discovery protocol.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::attributes::ScheduleAttributes;

/// Future returned by an async job body.
pub type JobFuture = BoxFuture<'static, ()>;

/// Stable identity of a declared job: owning component plus method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub owner: String,
    pub method: String,
}

impl JobId {
    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)
    }
}

/// Zero-argument unit of work.
///
/// Async bodies are interrupted at their next await point when their task is
/// cancelled. Blocking bodies run on the blocking pool and always run to
/// completion once started.
#[derive(Clone)]
pub enum Callable {
    Async(Arc<dyn Fn() -> JobFuture + Send + Sync>),
    Blocking(Arc<dyn Fn() + Send + Sync>),
}

impl Callable {
    /// Wrap an async closure.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Callable::Async(Arc::new(move || f().boxed()))
    }

    /// Wrap a blocking closure.
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Callable::Blocking(Arc::new(f))
    }

    /// Whether this callable occupies a blocking thread while it runs.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Callable::Blocking(_))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Async(_) => f.write_str("Callable::Async"),
            Callable::Blocking(_) => f.write_str("Callable::Blocking"),
        }
    }
}

/// One schedulable unit of work, as handed over by discovery.
#[derive(Debug, Clone)]
pub struct JobDeclaration {
    pub id: JobId,
    pub callable: Callable,
    pub attributes: ScheduleAttributes,
}

impl JobDeclaration {
    pub fn new(id: JobId, callable: Callable, attributes: ScheduleAttributes) -> Self {
        Self {
            id,
            callable,
            attributes,
        }
    }
}

/// Discovery collaborator.
///
/// A component that owns scheduled methods implements this to hand its
/// declarations to the scheduler once, at startup.
pub trait JobProvider: Send + Sync {
    /// Stable key of the owning component.
    fn owner(&self) -> &str;

    /// All job declarations of this component.
    fn declarations(self: Arc<Self>) -> Vec<JobDeclaration>;
}
