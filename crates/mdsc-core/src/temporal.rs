//! # Temporal Types
//!
//! Defines `Timestamp`, a UTC instant with millisecond precision that
//! serializes as integer epoch milliseconds, the representation used by
//! vehicle events, telemetry, policy dates and compliance snapshots.
//!
//! Also defines [`LocalTime`], the wall-clock time-of-day used by rule
//! activity windows (`"19:00:00"`), and [`DayOfWeek`].

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MdscError;

/// A UTC instant, millisecond precision, serialized as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`, truncating sub-milliseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let millis = dt.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(dt))
    }

    /// Create a timestamp from Unix epoch milliseconds.
    pub fn from_epoch_millis(millis: i64) -> Result<Self, MdscError> {
        DateTime::from_timestamp_millis(millis)
            .map(Self)
            .ok_or(MdscError::InvalidTimestamp(millis))
    }

    /// Unix epoch milliseconds.
    pub fn epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Elapsed time from `earlier` to `self`. Negative if `earlier` is later.
    pub fn since(&self, earlier: Timestamp) -> Duration {
        self.0.signed_duration_since(earlier.0)
    }

    /// This instant moved back by `duration`.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Self(self.0.checked_sub_signed(duration).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// Render as RFC 3339 with millisecond precision and Z suffix.
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.epoch_millis())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Self::from_epoch_millis(millis).map_err(serde::de::Error::custom)
    }
}

/// A local wall-clock time of day, seconds precision.
///
/// Parsed from `HH:MM:SS` (or `HH:MM`) and rendered back as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTime(NaiveTime);

impl LocalTime {
    /// Parse `HH:MM:SS` or `HH:MM`.
    pub fn parse(s: &str) -> Result<Self, MdscError> {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(Self)
            .map_err(|_| MdscError::InvalidTime {
                value: s.to_string(),
            })
    }

    /// Build from hour/minute/second, `None` if out of range.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(Self)
    }

    /// Access the inner `NaiveTime`.
    pub fn as_naive(&self) -> &NaiveTime {
        &self.0
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl Serialize for LocalTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocalTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Day of the week as written in rule `days` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => Self::Sun,
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_from_utc_truncates_to_millis() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let dt = dt.with_nanosecond(123_456_789).unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.as_datetime().nanosecond(), 123_000_000);
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:30:45.123Z");
    }

    #[test]
    fn test_serde_is_epoch_millis() {
        let ts = Timestamp::from_epoch_millis(1_700_000_000_123).unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1700000000123");
        let back: Timestamp = serde_json::from_str("1700000000123").unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_since_and_saturating_sub() {
        let later = Timestamp::from_epoch_millis(10_000).unwrap();
        let earlier = later.saturating_sub(Duration::seconds(4));
        assert_eq!(earlier.epoch_millis(), 6_000);
        assert_eq!(later.since(earlier), Duration::seconds(4));
        assert!(earlier.since(later) < Duration::zero());
    }

    #[test]
    fn test_out_of_range_millis_rejected() {
        assert!(Timestamp::from_epoch_millis(i64::MAX).is_err());
    }

    // ---- LocalTime ----

    #[test]
    fn test_local_time_parse_formats() {
        assert_eq!(LocalTime::parse("19:00:00").unwrap().to_string(), "19:00:00");
        assert_eq!(LocalTime::parse("05:30").unwrap().to_string(), "05:30:00");
        assert!(LocalTime::parse("25:00:00").is_err());
        assert!(LocalTime::parse("evening").is_err());
    }

    #[test]
    fn test_local_time_ordering() {
        assert!(LocalTime::parse("05:00:00").unwrap() < LocalTime::parse("19:00:00").unwrap());
    }

    #[test]
    fn test_local_time_serde() {
        let t: LocalTime = serde_json::from_str("\"07:15:00\"").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"07:15:00\"");
        assert!(serde_json::from_str::<LocalTime>("\"7pm\"").is_err());
    }

    #[test]
    fn test_day_of_week_from_chrono() {
        assert_eq!(DayOfWeek::from(Weekday::Sun), DayOfWeek::Sun);
        assert_eq!(serde_json::to_string(&DayOfWeek::Wed).unwrap(), "\"wed\"");
    }
}
