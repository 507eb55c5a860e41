//! # Clock and Activity Windows
//!
//! [`ComplianceClock`] pins "now" and the regulator's IANA timezone for one
//! evaluation. Every temporal decision (rule activity windows, policy date
//! ranges, dwell times) reads from it, never from ambient process state.
//!
//! ## Activity Window Semantics
//!
//! A rule is active when all of the following hold, each vacuously true
//! when unset:
//!
//! 1. `days` (non-empty) contains the local weekday.
//! 2. local time-of-day is at or after `start_time`.
//! 3. local time-of-day is at or before `end_time`.
//!
//! When both times are set and `start_time > end_time` the window spans
//! midnight: `19:00:00`–`05:00:00` means "at/after 19:00 OR at/before 05:00".

use chrono::{DateTime, Datelike, Duration, Timelike};
use chrono_tz::Tz;

use mdsc_core::{DayOfWeek, LocalTime, Policy, RuleScope, Timestamp};

use crate::error::EngineError;

/// Parse a required IANA timezone name.
///
/// Absence and unrecognized names are both configuration errors.
pub fn parse_timezone(name: Option<&str>) -> Result<Tz, EngineError> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| EngineError::Configuration("TIMEZONE must be set".into()))?;
    name.parse::<Tz>().map_err(|e| {
        EngineError::Configuration(format!("unrecognized IANA timezone {name:?}: {e}"))
    })
}

/// A fixed evaluation instant in a fixed timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplianceClock {
    now: Timestamp,
    timezone: Tz,
}

impl ComplianceClock {
    /// Pin an explicit instant.
    pub fn new(now: Timestamp, timezone: Tz) -> Self {
        Self { now, timezone }
    }

    /// Pin the current system time.
    pub fn system(timezone: Tz) -> Self {
        Self::new(Timestamp::now(), timezone)
    }

    /// The evaluation instant.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// The configured timezone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The evaluation instant in local time.
    pub fn local_now(&self) -> DateTime<Tz> {
        self.now.as_datetime().with_timezone(&self.timezone)
    }

    /// The instant `window` before now.
    pub fn window_start(&self, window: Duration) -> Timestamp {
        self.now.saturating_sub(window)
    }

    /// Whether a rule's day/time window contains the evaluation instant.
    pub fn is_rule_active(&self, scope: &RuleScope) -> bool {
        let local = self.local_now();

        if let Some(days) = scope.days.as_deref().filter(|days| !days.is_empty()) {
            if !days.contains(&DayOfWeek::from(local.weekday())) {
                return false;
            }
        }

        let Some(time_of_day) = LocalTime::from_hms(local.hour(), local.minute(), local.second())
        else {
            return false;
        };
        window_contains(scope.start_time, scope.end_time, time_of_day)
    }
}

/// Time-of-day window test, inclusive at both ends, midnight-aware.
pub fn window_contains(start: Option<LocalTime>, end: Option<LocalTime>, at: LocalTime) -> bool {
    match (start, end) {
        (Some(start), Some(end)) if start > end => at >= start || at <= end,
        _ => start.map_or(true, |start| at >= start) && end.map_or(true, |end| at <= end),
    }
}

/// Whether `now` falls inside the policy's `[start_date, end_date]` range.
/// An absent `end_date` leaves the policy open-ended.
pub fn is_policy_active(policy: &Policy, now: Timestamp) -> bool {
    match policy.end_date {
        Some(end_date) => policy.start_date <= now && now <= end_date,
        None => policy.start_date <= now,
    }
}
