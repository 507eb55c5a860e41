//! Snapshot construction.
//!
//! Every snapshot in one batch run shares the run's `compliance_as_of`
//! instant; each gets a freshly generated id.

use mdsc_core::{
    ComplianceEngineResult, ComplianceSnapshot, Policy, PolicyReference, ProviderId, SnapshotId,
    Timestamp,
};

/// Builds snapshots stamped with one evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotBuilder {
    compliance_as_of: Timestamp,
}

impl SnapshotBuilder {
    pub fn new(compliance_as_of: Timestamp) -> Self {
        Self { compliance_as_of }
    }

    pub fn compliance_as_of(&self) -> Timestamp {
        self.compliance_as_of
    }

    /// Wrap an engine result for `policy` × `provider_id`.
    pub fn build(
        &self,
        policy: &Policy,
        provider_id: ProviderId,
        result: ComplianceEngineResult,
    ) -> ComplianceSnapshot {
        ComplianceSnapshot {
            compliance_snapshot_id: SnapshotId::new(),
            compliance_as_of: self.compliance_as_of,
            policy: PolicyReference {
                policy_id: policy.policy_id,
                name: policy.name.clone(),
            },
            provider_id,
            excess_vehicles_count: result.excess_vehicles_count,
            total_violations: result.total_violations,
            vehicles_found: result.vehicles_found,
        }
    }
}
