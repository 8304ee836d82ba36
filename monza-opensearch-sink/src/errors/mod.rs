//! Error types for the monza OpenSearch sink.

use std::time::Duration;

use monza_opensearch_repository::SearchError;
use thiserror::Error;

/// Errors that can occur in the sink.
///
/// Only `setup` surfaces errors to the caller. Per-event failures are logged
/// and handed to the configured `FailureObserver`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The store is unreachable or its client could not be built.
    #[error("Connectivity error: {0}")]
    ConnectivityError(String),

    /// A single document could not be handed to the bulk indexer.
    #[error("Submission error: {0}")]
    SubmissionError(String),

    /// The destination was used after teardown.
    #[error("Destination has been torn down")]
    ShutdownRaceError,

    /// `setup` was called on a destination that already started.
    #[error("Destination already started")]
    AlreadyStarted,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The operation's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// The worker did not drain within the configured timeout.
    #[error("Drain timed out after {0:?}")]
    DrainTimeout(Duration),
}

impl SinkError {
    /// Create a connectivity error.
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::ConnectivityError(msg.into())
    }

    /// Create a submission error.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::SubmissionError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<SearchError> for SinkError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::ConnectionError(msg) => Self::ConnectivityError(msg),
            SearchError::StatusError { status, body } => {
                Self::ConnectivityError(format!("store answered {}: {}", status, body))
            }
            other => Self::SubmissionError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_map_to_connectivity() {
        let err: SinkError = SearchError::connection("refused").into();

        assert_eq!(err, SinkError::connectivity("refused"));
    }

    #[test]
    fn test_closed_indexer_maps_to_submission() {
        let err: SinkError = SearchError::IndexerClosed.into();

        assert!(matches!(err, SinkError::SubmissionError(_)));
    }
}
