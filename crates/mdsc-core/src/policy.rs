//! # Policies and Rules
//!
//! A policy is a named, time-scoped bundle of rules that all share one
//! [`RuleType`]. Rules are a closed sum type over count, speed and time
//! rules; every consumer matches on [`Rule`] exhaustively, so adding a rule
//! type is a compile error until every evaluation path handles it.
//!
//! ## Decoding
//!
//! [`decode_policy`] / [`decode_policies`] inspect each rule's `rule_type`
//! string before typed deserialization, so an unrecognized type surfaces
//! as [`MdscError::UnsupportedRuleType`] instead of an opaque serde error.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MdscError;
use crate::identity::{GeographyId, PolicyId, ProviderId, RuleId};
use crate::temporal::{DayOfWeek, LocalTime, Timestamp};
use crate::vehicle::{EventType, VehicleState, VehicleType};

// ---------------------------------------------------------------------------
// RuleType
// ---------------------------------------------------------------------------

/// Discriminant of [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Capacity rule: at most/at least N vehicles in an area.
    Count,
    /// Speed limit rule.
    Speed,
    /// Dwell-time rule.
    Time,
}

impl RuleType {
    /// The wire name of this rule type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Speed => "speed",
            Self::Time => "time",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "speed" => Ok(Self::Speed),
            "time" => Ok(Self::Time),
            other => Err(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Units a speed rule's `maximum` is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnits {
    /// Metres per second (the telemetry unit).
    Mps,
    /// Kilometres per hour.
    Kph,
    /// Miles per hour.
    Mph,
}

impl SpeedUnits {
    /// Convert a telemetry speed in metres per second into these units.
    pub fn from_metres_per_second(self, speed: f64) -> f64 {
        match self {
            Self::Mps => speed,
            Self::Kph => speed * 3.6,
            Self::Mph => speed * 3600.0 / 1609.344,
        }
    }
}

/// Units a time rule's `maximum` is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnits {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnits {
    /// Length of one unit in milliseconds.
    pub fn millis(self) -> i64 {
        match self {
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Fields every rule type shares: identity, geofence, state filter,
/// vehicle-type filter and activity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleScope {
    pub rule_id: RuleId,
    pub name: String,
    pub geographies: Vec<GeographyId>,
    /// Vehicle state → accepted event types. An empty list accepts any
    /// event type in that state. `None` accepts every state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<HashMap<VehicleState, Vec<EventType>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_types: Option<Vec<VehicleType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayOfWeek>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<LocalTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<LocalTime>,
}

/// Capacity rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRule {
    #[serde(flatten)]
    pub scope: RuleScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<u64>,
}

/// Speed rule. `maximum` is the violation threshold: at or above it is a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedRule {
    #[serde(flatten)]
    pub scope: RuleScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_units: Option<SpeedUnits>,
}

/// Dwell-time rule. `maximum` is the violation threshold: at or above it is a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRule {
    #[serde(flatten)]
    pub scope: RuleScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_units: Option<TimeUnits>,
}

/// A single rule, tagged on `rule_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum Rule {
    Count(CountRule),
    Speed(SpeedRule),
    Time(TimeRule),
}

impl Rule {
    /// The shared scope fields.
    pub fn scope(&self) -> &RuleScope {
        match self {
            Self::Count(rule) => &rule.scope,
            Self::Speed(rule) => &rule.scope,
            Self::Time(rule) => &rule.scope,
        }
    }

    /// The rule's id.
    pub fn rule_id(&self) -> RuleId {
        self.scope().rule_id
    }

    /// The rule's discriminant.
    pub fn rule_type(&self) -> RuleType {
        match self {
            Self::Count(_) => RuleType::Count,
            Self::Speed(_) => RuleType::Speed,
            Self::Time(_) => RuleType::Time,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A regulatory policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: PolicyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: Timestamp,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub publish_date: Option<Timestamp>,
    #[serde(default)]
    pub prev_policies: Option<Vec<PolicyId>>,
    /// Providers this policy applies to. Absent or empty means all providers.
    #[serde(default)]
    pub provider_ids: Option<Vec<ProviderId>>,
    pub rules: Vec<Rule>,
}

impl Policy {
    /// The single rule type shared by every rule of this policy.
    ///
    /// Returns `Ok(None)` for a policy with no rules and an error if the
    /// policy mixes rule types.
    pub fn rule_type(&self) -> Result<Option<RuleType>, MdscError> {
        let mut rules = self.rules.iter().map(Rule::rule_type);
        let Some(first) = rules.next() else {
            return Ok(None);
        };
        match rules.find(|t| *t != first) {
            Some(other) => Err(MdscError::MixedRuleTypes {
                policy: self.policy_id.to_string(),
                first: first.to_string(),
                second: other.to_string(),
            }),
            None => Ok(Some(first)),
        }
    }

    /// The provider restriction, `None` when the policy applies to everyone.
    pub fn provider_restriction(&self) -> Option<&[ProviderId]> {
        self.provider_ids
            .as_deref()
            .filter(|providers| !providers.is_empty())
    }
}

/// Decode one policy from JSON, rejecting unknown rule types explicitly.
pub fn decode_policy(value: serde_json::Value) -> Result<Policy, MdscError> {
    check_rule_types(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Decode a JSON array of policies, rejecting unknown rule types explicitly.
pub fn decode_policies(json: &str) -> Result<Vec<Policy>, MdscError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    values.into_iter().map(decode_policy).collect()
}

fn check_rule_types(policy: &serde_json::Value) -> Result<(), MdscError> {
    let policy_id = policy
        .get("policy_id")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>");
    let rules = policy
        .get("rules")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    for rule in rules {
        let rule_type = rule
            .get("rule_type")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if RuleType::from_str(rule_type).is_err() {
            return Err(MdscError::UnsupportedRuleType {
                policy: policy_id.to_string(),
                rule_type: rule_type.to_string(),
            });
        }
    }
    Ok(())
}
