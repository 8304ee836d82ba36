//! Counters kept by the bulk indexer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the bulk indexer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkIndexerStats {
    /// Items accepted by `add`.
    pub num_added: u64,
    /// Items handed to a bulk request, whatever the outcome.
    pub num_flushed: u64,
    /// Items the store acknowledged.
    pub num_indexed: u64,
    /// Items that were rejected or whose request failed for good.
    pub num_failed: u64,
    /// Bulk requests sent, retries included.
    pub num_requests: u64,
}

impl BulkIndexerStats {
    /// Items added but not yet flushed.
    pub fn pending(&self) -> u64 {
        self.num_added.saturating_sub(self.num_flushed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) added: AtomicU64,
    pub(crate) flushed: AtomicU64,
    pub(crate) indexed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) requests: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> BulkIndexerStats {
        BulkIndexerStats {
            num_added: self.added.load(Ordering::Relaxed),
            num_flushed: self.flushed.load(Ordering::Relaxed),
            num_indexed: self.indexed.load(Ordering::Relaxed),
            num_failed: self.failed.load(Ordering::Relaxed),
            num_requests: self.requests.load(Ordering::Relaxed),
        }
    }
}
