//! Config watcher.
//!
//! Polls the [`ConfigSource`] on a fixed interval, publishes each fetch as a
//! new immutable [`ConfigSnapshot`] and raises one coalesced [`ConfigChange`]
//! per tick in which at least one non-empty value changed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dynsched_protocols::{ConfigChange, ConfigSnapshot, ConfigSource, SourceError};

const EVENT_CAPACITY: usize = 16;

/// Owner of the authoritative config snapshot.
pub struct ConfigWatcher {
    source: Arc<dyn ConfigSource>,
    interval: Duration,
    snapshot_tx: watch::Sender<Arc<ConfigSnapshot>>,
    events: broadcast::Sender<ConfigChange>,
    seeded: AtomicBool,
    /// Set when a fetch failed before the first successful one.
    seed_missed: AtomicBool,
    tick_lock: Mutex<()>,
    ticks: AtomicU64,
    failures: AtomicU64,
}

impl ConfigWatcher {
    pub fn new(source: Arc<dyn ConfigSource>, interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(ConfigSnapshot::empty()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            interval,
            snapshot_tx,
            events,
            seeded: AtomicBool::new(false),
            seed_missed: AtomicBool::new(false),
            tick_lock: Mutex::new(()),
            ticks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.events.subscribe()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Boot-time fetch. Seeds the snapshot without raising an event.
    pub async fn prime(&self) -> Result<Arc<ConfigSnapshot>, SourceError> {
        self.fetch_and_publish().await?;
        Ok(self.snapshot())
    }

    /// One watcher tick. A failed fetch is logged and leaves the current
    /// snapshot in place. A seed that follows a failed fetch raises an event
    /// naming every seeded key, since nothing was reconciled against it yet.
    pub async fn tick(&self) -> Option<ConfigChange> {
        match self.fetch_and_publish().await {
            Ok(change) => change,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "Config fetch failed, keeping previous snapshot"
                );
                None
            }
        }
    }

    /// Tick every `interval` until `token` is cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        info!(
            source = self.source.name(),
            interval_ms = self.interval.as_millis() as u64,
            "Config watcher started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; boot already fetched.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = self.tick() => {}
                    }
                }
            }
        }

        info!("Config watcher stopped");
    }

    async fn fetch_and_publish(&self) -> Result<Option<ConfigChange>, SourceError> {
        let _guard = self.tick_lock.lock().await;
        self.ticks.fetch_add(1, Ordering::Relaxed);

        let values = match self.source.fetch_all().await {
            Ok(values) => values,
            Err(e) => {
                if !self.is_seeded() {
                    self.seed_missed.store(true, Ordering::SeqCst);
                }
                return Err(e);
            }
        };
        let previous = self.snapshot();

        if !self.seeded.swap(true, Ordering::SeqCst) {
            let seed = Arc::new(ConfigSnapshot::new(values, previous.version() + 1));
            info!(
                source = self.source.name(),
                keys = seed.len(),
                version = seed.version(),
                "Config snapshot seeded"
            );
            let late = self.seed_missed.swap(false, Ordering::SeqCst);
            let version = seed.version();
            let keys = non_empty_keys(&seed);
            self.snapshot_tx.send_replace(seed);
            if !late {
                return Ok(None);
            }

            // Tasks were registered from literals only; rebuild them once.
            info!(version, "Config seeded after a failed fetch, requesting reconciliation");
            let change = ConfigChange {
                version,
                changed_keys: keys,
            };
            let _ = self.events.send(change.clone());
            return Ok(Some(change));
        }

        if &values == previous.values() {
            debug!(version = previous.version(), "Config unchanged");
            return Ok(None);
        }

        let next = Arc::new(ConfigSnapshot::new(values, previous.version() + 1));
        let changed = changed_keys(&previous, &next);
        let version = next.version();
        self.snapshot_tx.send_replace(next);

        if changed.is_empty() {
            debug!(version, "Config snapshot replaced without value changes");
            return Ok(None);
        }

        info!(version, changed = ?changed, "Config values changed");
        let change = ConfigChange {
            version,
            changed_keys: changed,
        };
        // No subscriber is not an error: the snapshot is already published.
        let _ = self.events.send(change.clone());
        Ok(Some(change))
    }
}

/// Keys whose value is non-empty in both snapshots and differs, sorted.
///
/// Additions, removals and transitions from or to an empty value are not
/// changes.
fn non_empty_keys(snapshot: &ConfigSnapshot) -> Vec<String> {
    let mut keys: Vec<String> = snapshot
        .values()
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, _)| key.clone())
        .collect();
    keys.sort();
    keys
}

pub fn changed_keys(previous: &ConfigSnapshot, next: &ConfigSnapshot) -> Vec<String> {
    let mut changed: Vec<String> = next
        .values()
        .iter()
        .filter(|(key, value)| {
            !value.is_empty()
                && previous
                    .lookup(key)
                    .is_some_and(|old| old != value.as_str())
        })
        .map(|(key, _)| key.clone())
        .collect();
    changed.sort();
    changed
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
