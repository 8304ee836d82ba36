//! Bulk write client trait definition.
//!
//! This module defines the abstract interface of the document store as seen by
//! the destination: a liveness check and a bulk write.

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::{BulkItem, BulkResponse};

/// Abstract interface for the document store.
///
/// Implementations can be swapped for different backends (OpenSearch, in-memory
/// mocks, etc.) enabling easy testing.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so the client handle can be shared
/// by every bulk indexer worker.
#[async_trait]
pub trait BulkWriteClient: Send + Sync {
    /// Check that the store is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the store answered the ping
    /// * `Err(SearchError)` - If no node could be reached
    async fn ping(&self) -> Result<(), SearchError>;

    /// Submit a batch of items in a single bulk request.
    ///
    /// A successful return only means the request was accepted; individual
    /// items may still have been rejected and are reported in the response.
    ///
    /// # Arguments
    ///
    /// * `items` - The documents to write
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - Per-item outcomes
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk(&self, items: &[BulkItem]) -> Result<BulkResponse, SearchError>;
}
