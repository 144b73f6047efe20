//! Store error types.

use footprint_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected ledger input.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Key that cannot be mapped to a storage location.
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The ledger service is no longer running.
    #[error("Ledger service is not running")]
    ServiceClosed,
}

impl StoreError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }

    /// Returns true if the caller supplied input the ledger refuses to record.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StoreError::Core(e) if e.is_invalid_input())
    }
}
