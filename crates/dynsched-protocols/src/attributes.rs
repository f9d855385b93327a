//! As-declared schedule attributes.
//!
//! Every string attribute is a literal plus an optional config key. When the
//! key resolves to a non-empty value in the current snapshot that value wins,
//! otherwise the literal is used. Duration attributes carry the literal and
//! the key separately because the two are not interchangeable: setting both
//! forms of `initial_delay` is a declaration error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A string attribute that may be indirected through the config store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValue {
    /// Config key to look up first.
    pub key: Option<String>,
    /// Fallback used when the key is absent, empty, or not declared.
    pub literal: String,
}

impl ConfigValue {
    /// A plain literal with no config indirection.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            key: None,
            literal: value.into(),
        }
    }

    /// A config key with an empty fallback.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            literal: String::new(),
        }
    }

    /// A config key with an explicit fallback literal.
    pub fn key_or(key: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            literal: fallback.into(),
        }
    }
}

/// Raw schedule attributes of one job declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAttributes {
    pub cron: ConfigValue,
    pub zone: ConfigValue,
    pub enable: ConfigValue,
    pub fixed_delay: Option<Duration>,
    pub fixed_delay_key: Option<String>,
    pub fixed_rate: Option<Duration>,
    pub fixed_rate_key: Option<String>,
    pub initial_delay: Option<Duration>,
    pub initial_delay_key: Option<String>,
}

impl Default for ScheduleAttributes {
    fn default() -> Self {
        Self {
            cron: ConfigValue::default(),
            zone: ConfigValue::default(),
            enable: ConfigValue::literal("true"),
            fixed_delay: None,
            fixed_delay_key: None,
            fixed_rate: None,
            fixed_rate_key: None,
            initial_delay: None,
            initial_delay_key: None,
        }
    }
}

impl ScheduleAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal cron expression.
    pub fn cron(mut self, expression: impl Into<String>) -> Self {
        self.cron.literal = expression.into();
        self
    }

    /// Config key holding the cron expression.
    pub fn cron_key(mut self, key: impl Into<String>) -> Self {
        self.cron.key = Some(key.into());
        self
    }

    /// Literal time zone (IANA name). Blank means the local zone.
    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone.literal = zone.into();
        self
    }

    pub fn zone_key(mut self, key: impl Into<String>) -> Self {
        self.zone.key = Some(key.into());
        self
    }

    /// Literal enable flag (defaults to `"true"`).
    pub fn enable(mut self, flag: impl Into<String>) -> Self {
        self.enable.literal = flag.into();
        self
    }

    pub fn enable_key(mut self, key: impl Into<String>) -> Self {
        self.enable.key = Some(key.into());
        self
    }

    pub fn fixed_delay(mut self, delay: Duration) -> Self {
        self.fixed_delay = Some(delay);
        self
    }

    /// Config key holding the fixed delay in milliseconds.
    pub fn fixed_delay_key(mut self, key: impl Into<String>) -> Self {
        self.fixed_delay_key = Some(key.into());
        self
    }

    pub fn fixed_rate(mut self, period: Duration) -> Self {
        self.fixed_rate = Some(period);
        self
    }

    /// Config key holding the fixed rate period in milliseconds.
    pub fn fixed_rate_key(mut self, key: impl Into<String>) -> Self {
        self.fixed_rate_key = Some(key.into());
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Config key holding the initial delay in milliseconds.
    pub fn initial_delay_key(mut self, key: impl Into<String>) -> Self {
        self.initial_delay_key = Some(key.into());
        self
    }

    /// Every config key these attributes may read.
    pub fn referenced_keys(&self) -> Vec<&str> {
        [
            self.cron.key.as_deref(),
            self.zone.key.as_deref(),
            self.enable.key.as_deref(),
            self.fixed_delay_key.as_deref(),
            self.fixed_rate_key.as_deref(),
            self.initial_delay_key.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
