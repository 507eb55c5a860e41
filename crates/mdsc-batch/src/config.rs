//! Batch run configuration.
//!
//! Loaded from environment variables, optionally layered over a YAML file.
//! Environment values win over file values; both win over defaults.
//!
//! Variables:
//! - `TIMEZONE` (required): IANA zone name for rule activity windows
//! - `COMPLIANCE_BATCH_SIZE` (default: 10): snapshots per sink submission
//! - `COMPLIANCE_MAX_RETRIES` (default: 5): retries after the first attempt
//! - `COMPLIANCE_RETRY_BASE_DELAY_MS` (default: 1000)
//! - `COMPLIANCE_RETRY_MAX_DELAY_MS` (default: 30000)
//! - `COMPLIANCE_EVENT_WINDOW_HOURS` (default: 48)

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use mdsc_engine::{parse_timezone, EngineError, DEFAULT_EVENT_WINDOW_HOURS};

use crate::error::BatchError;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Bounded exponential backoff for whole-run retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

/// Resolved configuration for one batch process.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub timezone: Tz,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub event_window: chrono::Duration,
}

/// On-disk form of [`BatchConfig`]. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfigFile {
    pub timezone: Option<String>,
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    pub event_window_hours: Option<i64>,
}

impl BatchConfigFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, BatchError> {
        serde_yaml::from_str(yaml).map_err(|e| BatchError::Config(format!("invalid config file: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BatchError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }
}

impl BatchConfig {
    /// A configuration with defaults for everything but the timezone.
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            event_window: chrono::Duration::hours(DEFAULT_EVENT_WINDOW_HOURS),
        }
    }

    /// Load from process environment alone.
    pub fn from_env() -> Result<Self, BatchError> {
        Self::resolve(BatchConfigFile::default(), |key| std::env::var(key).ok())
    }

    /// Load a YAML file, then apply process environment over it.
    pub fn from_file_and_env(path: &Path) -> Result<Self, BatchError> {
        Self::resolve(BatchConfigFile::load(path)?, |key| std::env::var(key).ok())
    }

    /// Merge `file` with values from `env`, which take precedence.
    pub fn resolve(
        file: BatchConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BatchError> {
        let timezone_name = env("TIMEZONE").or(file.timezone);
        let timezone = parse_timezone(timezone_name.as_deref()).map_err(|e| match e {
            EngineError::Configuration(msg) => BatchError::Config(msg),
            other => BatchError::Engine(other),
        })?;

        let batch_size = env_parsed(&env, "COMPLIANCE_BATCH_SIZE")?
            .or(file.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(BatchError::Config("COMPLIANCE_BATCH_SIZE must be at least 1".into()));
        }

        let base_delay_ms = env_parsed(&env, "COMPLIANCE_RETRY_BASE_DELAY_MS")?
            .or(file.retry_base_delay_ms)
            .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);
        let max_delay_ms = env_parsed(&env, "COMPLIANCE_RETRY_MAX_DELAY_MS")?
            .or(file.retry_max_delay_ms)
            .unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS);
        let retry = RetryPolicy {
            max_retries: env_parsed(&env, "COMPLIANCE_MAX_RETRIES")?
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
        };

        let window_hours = env_parsed(&env, "COMPLIANCE_EVENT_WINDOW_HOURS")?
            .or(file.event_window_hours)
            .unwrap_or(DEFAULT_EVENT_WINDOW_HOURS);
        if window_hours <= 0 {
            return Err(BatchError::Config(
                "COMPLIANCE_EVENT_WINDOW_HOURS must be positive".into(),
            ));
        }
        let event_window = chrono::Duration::try_hours(window_hours).ok_or_else(|| {
            BatchError::Config(format!("COMPLIANCE_EVENT_WINDOW_HOURS={window_hours} is out of range"))
        })?;

        Ok(Self {
            timezone,
            batch_size,
            retry,
            event_window,
        })
    }
}

fn env_parsed<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, BatchError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| BatchError::Config(format!("invalid {key}={raw:?}: {e}")))
        })
        .transpose()
}
