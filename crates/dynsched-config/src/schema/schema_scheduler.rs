//! Scheduler runtime configuration (watcher interval, executor pool).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the executor does with a firing when every worker is busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaturationPolicy {
    /// Queue the firing until a worker frees up.
    #[default]
    Wait,
    /// Skip the firing and log it.
    Drop,
}

/// What `start()` does with a declaration that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidDeclarationPolicy {
    /// Log it and boot without that job.
    #[default]
    Skip,
    /// Refuse to boot.
    Abort,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between config watcher ticks.
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,

    /// Maximum concurrently running job invocations.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default)]
    pub saturation: SaturationPolicy,

    #[serde(default)]
    pub on_invalid: InvalidDeclarationPolicy,
}

fn default_watch_interval_secs() -> u64 {
    10
}

fn default_pool_size() -> usize {
    200
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            watch_interval_secs: default_watch_interval_secs(),
            pool_size: default_pool_size(),
            saturation: SaturationPolicy::default(),
            on_invalid: InvalidDeclarationPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Watcher tick interval as Duration.
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}
