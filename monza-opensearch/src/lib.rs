//! # Monza OpenSearch
//!
//! Entry point and configuration for running the OpenSearch destination as a
//! standalone relay: newline-delimited JSON events are read from an input
//! stream and recorded until the stream ends or the process is interrupted.

pub mod config;
pub mod relay;

pub use config::Dependencies;
pub use relay::{relay, RelayStats};

use thiserror::Error;

/// Errors that can occur during relay initialization or execution.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sink error.
    #[error("Sink error: {0}")]
    SinkError(#[from] monza_opensearch_sink::SinkError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RelayError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
