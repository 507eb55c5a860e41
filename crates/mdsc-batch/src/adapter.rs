//! # Adapter Interfaces
//!
//! The four external boundaries a batch run reads from and writes to. The
//! engine owns none of them.
//!
//! Implementations must be `Send + Sync` so they can be shared across
//! blocking tasks behind an `Arc`. The traits are synchronous; the
//! orchestrator calls them from `tokio::task::spawn_blocking`. All four are
//! object-safe so a deployment can select adapters at runtime.

use std::path::PathBuf;

use mdsc_core::{ComplianceSnapshot, Geography, MdscError, Policy, ProviderId};
use mdsc_engine::ProviderInputs;

/// Errors from store, gateway and sink operations.
///
/// Unavailability and I/O failures are transient. Malformed data is not:
/// re-reading it yields the same defect, so [`AdapterError::is_retryable`]
/// marks it fatal.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The backing service is unreachable or refused the operation.
    #[error("{operation} unavailable: {reason}")]
    Unavailable {
        /// The adapter operation that failed.
        operation: &'static str,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A backing file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backing file held malformed data.
    #[error("malformed data in {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: MdscError,
    },
}

impl AdapterError {
    /// Whether repeating the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { .. } | Self::Io { .. } => true,
            Self::Decode { .. } => false,
        }
    }

    pub fn unavailable(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.into(),
        }
    }
}

/// Source of policies eligible for evaluation.
pub trait PolicyStore: Send + Sync {
    /// Policies whose date range and publication make them candidates. The
    /// orchestrator still applies supersession and its own activity check.
    fn read_active_policies(&self) -> Result<Vec<Policy>, AdapterError>;

    /// Human-readable adapter name for logs.
    fn adapter_name(&self) -> &str;
}

/// Source of published geographies.
pub trait GeographyStore: Send + Sync {
    fn read_published_geographies(&self) -> Result<Vec<Geography>, AdapterError>;

    fn adapter_name(&self) -> &str;
}

/// Source of devices and their latest events.
pub trait DeviceEventGateway: Send + Sync {
    /// Devices and at most one (the latest) event per device, for one
    /// provider or, with `None`, for every provider.
    fn get_inputs(&self, provider_id: Option<&ProviderId>) -> Result<ProviderInputs, AdapterError>;

    fn adapter_name(&self) -> &str;
}

/// Destination for compliance snapshots.
///
/// Deduplication of re-submitted snapshots is the sink's concern: a retried
/// batch run submits fresh snapshots with new ids.
pub trait ComplianceSnapshotSink: Send + Sync {
    fn write_batch(&self, snapshots: &[ComplianceSnapshot]) -> Result<(), AdapterError>;

    fn adapter_name(&self) -> &str;
}
