//! Ingestion error types.

use thiserror::Error;

/// Errors that can occur while ingesting observations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// IO error reading a feed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A feed line is not a valid observation.
    #[error("Invalid observation on line {line}: {source}")]
    InvalidObservation {
        /// 1-based line number in the feed.
        line: usize,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A URL has no host component.
    #[error("URL has no host: {0}")]
    MissingHost(String),

    /// The consumer of emitted turns went away.
    #[error("Turn queue closed")]
    QueueClosed,
}

impl IngestError {
    /// Returns true if the error concerns a single observation and the feed
    /// can continue past it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::InvalidObservation { .. }
                | IngestError::InvalidUrl(_)
                | IngestError::MissingHost(_)
        )
    }
}
