//! Cron parsing helpers for the maintenance loop.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ::cron::Schedule;

use crate::error::SchedulerError;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Configuration uses standard 5-field cron: `min hour day-of-month month day-of-week`.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

pub fn parse_schedule(expr: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(&normalize_cron(expr)).map_err(|e| SchedulerError::InvalidCron {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// First tick strictly after `now`.
pub fn next_tick(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&now).next()
}

/// How long to sleep from `now` until `tick` (zero if already past).
pub fn until(tick: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (tick - now).to_std().unwrap_or(Duration::ZERO)
}
