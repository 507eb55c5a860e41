//! # mdsc-batch: Batch Orchestration
//!
//! Runs the compliance engine over every active policy and provider and
//! ships the resulting snapshots downstream.
//!
//! ## Architecture
//!
//! - **Adapters** (`adapter.rs`): object-safe interfaces to the policy
//!   store, geography store, device/event gateway and snapshot sink.
//!
//! - **Fixtures** (`fixture.rs`): file-backed and in-memory adapters for
//!   offline runs and tests.
//!
//! - **Config** (`config.rs`): environment and YAML configuration.
//!
//! - **Orchestrator** (`orchestrator.rs`): input gathering, parallel
//!   evaluation, chunked concurrent submission.
//!
//! - **Retry** (`retry.rs`): whole-run supervisor with capped backoff.
//!
//! ## Metrics
//!
//! Recorded through the `metrics` facade; no recorder is installed here.
//!
//! - `mdsc_batch_runs_total{outcome}`
//! - `mdsc_batch_attempts_total`
//! - `mdsc_batch_duration_seconds`
//! - `mdsc_snapshots_written_total`
//! - `mdsc_violations_total{policy_id}`

pub mod adapter;
pub mod config;
pub mod error;
pub mod fixture;
pub mod orchestrator;
pub mod retry;

pub use adapter::{AdapterError, ComplianceSnapshotSink, DeviceEventGateway, GeographyStore, PolicyStore};
pub use config::{BatchConfig, BatchConfigFile, RetryPolicy};
pub use error::BatchError;
pub use fixture::{FixtureStore, JsonLinesSink, MemorySnapshotSink};
pub use orchestrator::{
    compute_snapshots, gather_inputs, submit_snapshots, BatchAdapters, BatchOrchestrator, BatchReport,
};
pub use retry::supervise;
