//! # Compliance Results
//!
//! The output shapes of an evaluation: per-vehicle match information, the
//! engine result for one policy × provider, and the snapshot that wraps it
//! with identity and an evaluation timestamp.

use serde::{Deserialize, Serialize};

use crate::identity::{DeviceId, PolicyId, ProviderId, RuleId, SnapshotId};
use crate::temporal::Timestamp;
use crate::vehicle::{EventType, VehicleState};

/// GPS position reported in match information.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedGps {
    pub lat: f64,
    pub lng: f64,
}

/// Why a vehicle appears in a compliance result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedVehicleInformation {
    pub device_id: DeviceId,
    pub state: VehicleState,
    pub event_types: Vec<EventType>,
    pub timestamp: Timestamp,
    pub gps: MatchedGps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// The rule that captured this vehicle, if any. Overflowed vehicles have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_applied: Option<RuleId>,
    /// Every rule of the policy this vehicle matches.
    pub rules_matched: Vec<RuleId>,
}

impl MatchedVehicleInformation {
    /// Record `rule_id` as matched unless it already is.
    pub fn note_rule_matched(&mut self, rule_id: RuleId) {
        if !self.rules_matched.contains(&rule_id) {
            self.rules_matched.push(rule_id);
        }
    }
}

/// Result of evaluating one policy against one provider's fleet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComplianceEngineResult {
    pub vehicles_found: Vec<MatchedVehicleInformation>,
    pub excess_vehicles_count: u64,
    pub total_violations: u64,
}

/// Policy identity carried by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReference {
    pub policy_id: PolicyId,
    pub name: String,
}

/// One point-in-time violation report for a policy × provider pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    pub compliance_snapshot_id: SnapshotId,
    pub compliance_as_of: Timestamp,
    pub policy: PolicyReference,
    pub provider_id: ProviderId,
    pub excess_vehicles_count: u64,
    pub total_violations: u64,
    pub vehicles_found: Vec<MatchedVehicleInformation>,
}
