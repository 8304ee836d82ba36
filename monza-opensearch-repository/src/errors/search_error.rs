//! Search store error types.
//!
//! This module defines the error types that can occur while talking to the
//! document store through the bulk API.

use thiserror::Error;

/// Errors that can occur during bulk write operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Failed to construct the client or reach the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store answered with a non-success HTTP status.
    #[error("Request failed with status {status}: {body}")]
    StatusError { status: u16, body: String },

    /// Bulk indexing operation had failures.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to serialize a document for the store.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The bulk indexer no longer accepts items.
    #[error("Bulk indexer is closed")]
    IndexerClosed,
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::StatusError {
            status,
            body: body.into(),
        }
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::StatusError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Determine if the error is transient under the given retry statuses.
    ///
    /// Connection failures are always retryable; status errors are retryable
    /// when their status is listed in `retry_on_status`.
    pub fn is_retryable(&self, retry_on_status: &[u16]) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::StatusError { status, .. } => retry_on_status.contains(status),
            Self::BulkIndexError(_)
            | Self::SerializationError(_)
            | Self::ParseError(_)
            | Self::IndexerClosed => false,
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
