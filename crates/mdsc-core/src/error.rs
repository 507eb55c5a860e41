//! # Error Types
//!
//! Errors raised while decoding and validating the compliance data model.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Decoding errors name the offending field and value.
//! - An unknown `rule_type` is reported as [`MdscError::UnsupportedRuleType`],
//!   never as a generic serialization failure.

use thiserror::Error;

/// Top-level error type for the compliance data model.
#[derive(Error, Debug)]
pub enum MdscError {
    /// A rule declared a `rule_type` outside {count, speed, time}.
    #[error("unsupported rule type {rule_type:?} in policy {policy}")]
    UnsupportedRuleType {
        /// The policy id (or `<unknown>` if it could not be read).
        policy: String,
        /// The rule type string that was found.
        rule_type: String,
    },

    /// A policy mixes rules of more than one type.
    #[error("policy {policy} mixes rule types {first} and {second}")]
    MixedRuleTypes {
        /// The offending policy id.
        policy: String,
        /// Type of the first rule.
        first: String,
        /// First differing type encountered.
        second: String,
    },

    /// A local time-of-day string could not be parsed.
    #[error("invalid time of day {value:?}: expected HH:MM:SS")]
    InvalidTime {
        /// The raw value.
        value: String,
    },

    /// An epoch-millisecond value is outside the representable range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
