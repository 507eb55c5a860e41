//! # Policy Supersession
//!
//! Drops every policy directly named in some other policy's
//! `prev_policies`. Only direct references count: if A supersedes B and B
//! supersedes C, C is excluded only while B is in the input list.

use std::collections::HashSet;

use mdsc_core::{Policy, PolicyId};

/// Filter `policies` down to those no other policy in the list supersedes.
pub fn get_superseding_policies(policies: Vec<Policy>) -> Vec<Policy> {
    let superseded: HashSet<PolicyId> = policies
        .iter()
        .filter_map(|policy| policy.prev_policies.as_deref())
        .flatten()
        .copied()
        .collect();

    policies
        .into_iter()
        .filter(|policy| !superseded.contains(&policy.policy_id))
        .collect()
}
