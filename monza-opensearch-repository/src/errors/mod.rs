//! Error types for the monza OpenSearch repository.
//!
//! This module provides a unified error type for all bulk write operations.

mod search_error;

pub use search_error::SearchError;
