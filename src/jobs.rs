//! Demo jobs scheduled by the `run` command.
//!
//! Schedules are keyed into the config store so they can be changed with
//! `dynsched config set` while the scheduler is running:
//!
//! | job         | keys                        | fallback            |
//! |-------------|-----------------------------|---------------------|
//! | `job1`      | `job1_cron`, `job1_enable`  | every 5 minutes     |
//! | `job2`      | `job2_cron`, `job2_enable`  | every minute        |
//! | `heartbeat` | -                           | fixed rate 30 s     |

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::info;

use dynsched_protocols::{Callable, JobDeclaration, JobId, JobProvider, ScheduleAttributes};

const JOB1_RUNTIME: Duration = Duration::from_secs(60);
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Owner of the demo jobs.
#[derive(Default)]
pub(crate) struct CustomerTask {
    heartbeats: AtomicU64,
}

impl CustomerTask {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn job1(&self) {
        info!("job1 started");
        std::thread::sleep(JOB1_RUNTIME);
        info!("job1 finished");
    }

    async fn job2(&self) {
        info!("job2 fired");
    }

    async fn heartbeat(&self) {
        let beat = self.heartbeats.fetch_add(1, Ordering::Relaxed) + 1;
        info!(beat, "heartbeat");
    }
}

impl JobProvider for CustomerTask {
    fn owner(&self) -> &str {
        "CustomerTask"
    }

    fn declarations(self: Arc<Self>) -> Vec<JobDeclaration> {
        let job1 = self.clone();
        let job2 = self.clone();
        let heartbeat = self.clone();

        vec![
            JobDeclaration::new(
                JobId::new(self.owner(), "job1"),
                Callable::blocking(move || job1.job1()),
                ScheduleAttributes::new()
                    .cron("0 */5 * * * *")
                    .cron_key("job1_cron")
                    .enable_key("job1_enable"),
            ),
            JobDeclaration::new(
                JobId::new(self.owner(), "job2"),
                Callable::from_async(move || {
                    let task = job2.clone();
                    async move { task.job2().await }
                }),
                ScheduleAttributes::new()
                    .cron("0 * * * * *")
                    .cron_key("job2_cron")
                    .enable_key("job2_enable"),
            ),
            JobDeclaration::new(
                JobId::new(self.owner(), "heartbeat"),
                Callable::from_async(move || {
                    let task = heartbeat.clone();
                    async move { task.heartbeat().await }
                }),
                ScheduleAttributes::new().fixed_rate(HEARTBEAT_PERIOD),
            ),
        ]
    }
}
