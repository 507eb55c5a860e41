//! # mdsc-core: Foundational Types for the Mobility Compliance Engine
//!
//! This crate is the leaf of the workspace. It defines the data model the
//! rule-evaluation engine consumes and produces; every other crate depends
//! on it and it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `PolicyId`, `RuleId`, `GeographyId`,
//!    `DeviceId`, `ProviderId`, `SnapshotId` are distinct UUID newtypes.
//!
//! 2. **Closed rule sum type.** [`Rule`] is `Count | Speed | Time`, tagged
//!    on `rule_type`. Unknown types are rejected at decode time with
//!    [`MdscError::UnsupportedRuleType`].
//!
//! 3. **Epoch-millisecond timestamps.** [`Timestamp`] is UTC, millisecond
//!    precision, and serializes as an integer, matching the wire format of
//!    vehicle events and policies.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mdsc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod compliance;
pub mod error;
pub mod geography;
pub mod identity;
pub mod policy;
pub mod temporal;
pub mod vehicle;

pub use compliance::{
    ComplianceEngineResult, ComplianceSnapshot, MatchedGps, MatchedVehicleInformation,
    PolicyReference,
};
pub use error::MdscError;
pub use geography::{Geography, GeographyShape, Point};
pub use identity::{DeviceId, GeographyId, PolicyId, ProviderId, RuleId, SnapshotId};
pub use policy::{
    decode_policies, decode_policy, CountRule, Policy, Rule, RuleScope, RuleType, SpeedRule,
    SpeedUnits, TimeRule, TimeUnits,
};
pub use temporal::{DayOfWeek, LocalTime, Timestamp};
pub use vehicle::{Device, EventType, Gps, Telemetry, VehicleEvent, VehicleState, VehicleType};
