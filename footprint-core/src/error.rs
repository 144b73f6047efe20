//! Core error types for footprint.

use thiserror::Error;

/// Core error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A token count below zero reached the ledger boundary.
    #[error("Token count must not be negative: {0}")]
    NegativeTokens(i64),

    /// Malformed input that cannot be recorded.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns true if the error comes from rejected caller input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CoreError::NegativeTokens(_) | CoreError::InvalidInput(_))
    }
}
