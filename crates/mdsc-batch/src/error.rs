//! # Batch Errors
//!
//! Every failure a batch run can surface, classified for the retry
//! supervisor by [`BatchError::is_retryable`].

use mdsc_engine::EngineError;
use thiserror::Error;

use crate::adapter::AdapterError;

/// Errors raised while running a compliance batch.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Invalid or missing configuration. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine refused a policy (type dispatch, empty or mixed policy).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A store, gateway or sink failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// A spawned evaluation or submission task panicked or was cancelled.
    #[error("batch task failed: {0}")]
    Task(String),
}

impl BatchError {
    /// Whether re-running the whole batch could succeed.
    ///
    /// Configuration, engine and decode errors are deterministic in the
    /// inputs and would fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Engine(_) => false,
            Self::Adapter(err) => err.is_retryable(),
            Self::Task(_) => true,
        }
    }
}

impl From<tokio::task::JoinError> for BatchError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
