//! Resolved, executable schedules.

use std::fmt;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ValidationError;

/// Time zone a cron expression is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronZone {
    /// The host's local zone.
    Local,
    /// A named IANA zone.
    Named(Tz),
}

impl CronZone {
    /// Parse a zone name. Blank input selects the local zone.
    pub fn parse(zone: &str) -> Result<Self, ValidationError> {
        let zone = zone.trim();
        if zone.is_empty() {
            return Ok(CronZone::Local);
        }
        zone.parse::<Tz>()
            .map(CronZone::Named)
            .map_err(|_| ValidationError::InvalidZone(zone.to_string()))
    }
}

impl fmt::Display for CronZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CronZone::Local => f.write_str("local"),
            CronZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// When a task fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Calendar expression; each occurrence is computed independently of run time.
    Cron { expression: String, zone: CronZone },
    /// Next run starts `delay` after the previous run completed.
    FixedDelay {
        delay: Duration,
        initial_delay: Duration,
    },
    /// Next run starts `period` after the previous run started.
    FixedRate {
        period: Duration,
        initial_delay: Duration,
    },
}

impl Trigger {
    /// Short name of the trigger kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Cron { .. } => "cron",
            Trigger::FixedDelay { .. } => "fixed-delay",
            Trigger::FixedRate { .. } => "fixed-rate",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Cron { expression, zone } => write!(f, "cron '{}' ({})", expression, zone),
            Trigger::FixedDelay {
                delay,
                initial_delay,
            } => write!(
                f,
                "fixed-delay {}ms (initial {}ms)",
                delay.as_millis(),
                initial_delay.as_millis()
            ),
            Trigger::FixedRate {
                period,
                initial_delay,
            } => write!(
                f,
                "fixed-rate {}ms (initial {}ms)",
                period.as_millis(),
                initial_delay.as_millis()
            ),
        }
    }
}

/// Output of the resolver: what to run, and whether to run it at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub trigger: Trigger,
    pub enabled: bool,
}

impl ResolvedSchedule {
    pub fn new(trigger: Trigger, enabled: bool) -> Self {
        Self { trigger, enabled }
    }
}
