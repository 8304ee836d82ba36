//! # Monza OpenSearch Repository
//!
//! This crate provides the bulk write side of the monza OpenSearch destination.
//! It includes the error type, the `BulkWriteClient` interface, a concrete
//! OpenSearch implementation over the `_bulk` API, the retry policy applied to
//! bulk requests, and the `BulkIndexer` that buffers documents and flushes them
//! from a pool of workers.

pub mod bulk_indexer;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod retry;
pub mod types;

pub use bulk_indexer::{BulkIndexer, BulkIndexerConfig, BulkIndexerStats, FailureHandler};
pub use config::{BasicAuth, OpenSearchConfig};
pub use errors::SearchError;
pub use interfaces::BulkWriteClient;
pub use opensearch::OpenSearchClient;
pub use retry::{RetryBackoff, RetryPolicy};
pub use types::{BulkAction, BulkFailure, BulkItem, BulkItemOutcome, BulkResponse};
