//! Schedule resolver.
//!
//! Turns a job's as-declared [`ScheduleAttributes`] into an executable
//! [`ResolvedSchedule`] by reading config-key indirections from a
//! [`ConfigSnapshot`]. Resolution is a pure function: the same declaration
//! and snapshot always produce the same result, and failures are never
//! retried.

use std::str::FromStr;
use std::time::Duration;

use cron::Schedule;

use dynsched_protocols::{
    ConfigSnapshot, ConfigValue, CronZone, JobDeclaration, ResolvedSchedule, ScheduleAttributes,
    Trigger, ValidationError,
};

/// Resolve one declaration against a snapshot.
pub fn resolve(
    decl: &JobDeclaration,
    snapshot: &ConfigSnapshot,
) -> Result<ResolvedSchedule, ValidationError> {
    resolve_attributes(&decl.attributes, snapshot)
}

/// Resolve raw attributes against a snapshot.
pub fn resolve_attributes(
    attrs: &ScheduleAttributes,
    snapshot: &ConfigSnapshot,
) -> Result<ResolvedSchedule, ValidationError> {
    let enabled = parse_enable(&resolve_value(&attrs.enable, snapshot));

    let mut initial_delay = attrs.initial_delay;
    if let Some(raw) = lookup(attrs.initial_delay_key.as_deref(), snapshot) {
        if initial_delay.is_some() {
            return Err(ValidationError::ConflictingInitialDelay);
        }
        initial_delay = Some(parse_millis("initialDelay", raw)?);
    }

    let mut found: Vec<&'static str> = Vec::new();
    let mut trigger = None;

    let cron = resolve_value(&attrs.cron, snapshot);
    let cron = cron.trim();
    if !cron.is_empty() {
        if initial_delay.is_some() {
            return Err(ValidationError::InitialDelayWithCron);
        }
        let zone = CronZone::parse(&resolve_value(&attrs.zone, snapshot))?;
        validate_cron(cron)?;
        found.push("cron");
        trigger = Some(Trigger::Cron {
            expression: cron.to_string(),
            zone,
        });
    }

    let initial_delay = initial_delay.unwrap_or(Duration::ZERO);

    if let Some(delay) = attrs.fixed_delay {
        activate(&mut found, "fixedDelay")?;
        trigger = Some(Trigger::FixedDelay {
            delay,
            initial_delay,
        });
    }
    if let Some(raw) = lookup(attrs.fixed_delay_key.as_deref(), snapshot) {
        activate(&mut found, "fixedDelay")?;
        trigger = Some(Trigger::FixedDelay {
            delay: parse_millis("fixedDelay", raw)?,
            initial_delay,
        });
    }

    if let Some(period) = attrs.fixed_rate {
        activate(&mut found, "fixedRate")?;
        trigger = Some(Trigger::FixedRate {
            period,
            initial_delay,
        });
    }
    if let Some(raw) = lookup(attrs.fixed_rate_key.as_deref(), snapshot) {
        activate(&mut found, "fixedRate")?;
        trigger = Some(Trigger::FixedRate {
            period: parse_millis("fixedRate", raw)?,
            initial_delay,
        });
    }

    match trigger {
        Some(trigger) => Ok(ResolvedSchedule::new(trigger, enabled)),
        None => Err(ValidationError::ExactlyOneRequired { found }),
    }
}

/// Interpret an enable flag.
///
/// `true`, `t`, `yes`, `y` and `on` (any case) enable the job. Everything
/// else, including unrecognised text, disables it.
pub fn parse_enable(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "on"
    )
}

/// The effective text of a config-backed attribute: the snapshot value when
/// the key holds non-blank text, otherwise the literal.
fn resolve_value(value: &ConfigValue, snapshot: &ConfigSnapshot) -> String {
    lookup(value.key.as_deref(), snapshot)
        .unwrap_or(value.literal.as_str())
        .to_string()
}

fn lookup<'a>(key: Option<&str>, snapshot: &'a ConfigSnapshot) -> Option<&'a str> {
    key.and_then(|k| snapshot.lookup(k))
        .filter(|v| !v.trim().is_empty())
}

/// A second trigger branch is a declaration error; the report names every
/// branch seen so far.
fn activate(found: &mut Vec<&'static str>, branch: &'static str) -> Result<(), ValidationError> {
    found.push(branch);
    if found.len() > 1 {
        return Err(ValidationError::ExactlyOneRequired {
            found: std::mem::take(found),
        });
    }
    Ok(())
}

fn parse_millis(attribute: &'static str, raw: &str) -> Result<Duration, ValidationError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ValidationError::InvalidNumber {
            attribute,
            value: raw.to_string(),
        })
}

fn validate_cron(expression: &str) -> Result<(), ValidationError> {
    Schedule::from_str(expression)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidCron {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
