//! # mdsc-engine: Rule Evaluation
//!
//! Decides which vehicles violate which policy rules at one instant.
//!
//! ## Architecture
//!
//! - **Clock** (`clock.rs`): the pinned evaluation instant and timezone,
//!   rule activity windows and policy date ranges.
//!
//! - **Geofence** (`geofence.rs`): point-in-polygon containment against
//!   published geographies.
//!
//! - **Matchers** (`matchers.rs`): per-rule-type predicates over one
//!   device and its latest event.
//!
//! - **Inputs** (`inputs.rs`): event recency filtering and ordering.
//!
//! - **Processor** (`processor.rs`): per-policy evaluation, including the
//!   count-rule claim/overflow algorithm and the annotation pass.
//!
//! - **Supersession** (`supersession.rs`): drops policies replaced by
//!   newer ones.
//!
//! - **Snapshot** (`snapshot.rs`): wraps engine results for persistence.
//!
//! ## Crate Policy
//!
//! - Depends only on `mdsc-core` internally.
//! - No I/O. Every function is deterministic given its inputs and clock,
//!   except snapshot id generation.
//! - Evaluations share no mutable state and may run in parallel.

pub mod clock;
pub mod error;
pub mod geofence;
pub mod inputs;
pub mod matchers;
pub mod processor;
pub mod snapshot;
pub mod supersession;

pub use clock::{is_policy_active, parse_timezone, window_contains, ComplianceClock};
pub use error::EngineError;
pub use geofence::GeographyIndex;
pub use inputs::{filter_events, EvaluationInputs, ProviderInputs, DEFAULT_EVENT_WINDOW_HOURS};
pub use matchers::{is_rule_match, MatchContext};
pub use processor::{annotate, ComplianceProcessor};
pub use snapshot::SnapshotBuilder;
pub use supersession::get_superseding_policies;
