//! # Engine Errors
//!
//! Configuration and type-dispatch failures. Neither is retryable: both
//! indicate a deployment or policy-authoring defect that must be fixed.

use mdsc_core::{MdscError, PolicyId, RuleType};
use thiserror::Error;

/// Errors raised by the rule-evaluation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or unrecognized timezone, or another invalid engine setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A processor was handed a rule of a different type.
    #[error("unsupported rule type in policy {policy_id}: {expected} processor cannot evaluate a {found} rule")]
    UnsupportedRuleType {
        /// The policy being processed.
        policy_id: PolicyId,
        /// The rule type the processor evaluates.
        expected: RuleType,
        /// The rule type that was found.
        found: RuleType,
    },

    /// A policy without rules has no rule type to dispatch on.
    #[error("policy {0} has no rules")]
    EmptyPolicy(PolicyId),

    /// Data-model error (e.g. a policy mixing rule types).
    #[error(transparent)]
    Model(#[from] MdscError),
}
