//! Buffered bulk indexer.
//!
//! The indexer accepts single items and turns them into bulk requests. Items
//! go into one bounded queue shared by `num_workers` workers, so a worker busy
//! with a slow request never holds items back from the others. Each worker
//! flushes its buffer when it reaches `flush_bytes` or every `flush_interval`,
//! whichever comes first. Failed requests are retried according to the configured
//! `RetryPolicy`.

mod stats;
mod worker;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::errors::SearchError;
use crate::interfaces::BulkWriteClient;
use crate::retry::RetryPolicy;
use crate::types::{BulkFailure, BulkItem};

pub use stats::BulkIndexerStats;
use stats::StatsCounters;
use worker::IndexerWorker;

/// Callback invoked for every document that could not be written.
pub type FailureHandler = Arc<dyn Fn(BulkFailure) + Send + Sync>;

/// Configuration for the bulk indexer.
#[derive(Debug, Clone)]
pub struct BulkIndexerConfig {
    /// Number of workers submitting bulk requests concurrently.
    pub num_workers: usize,
    /// Maximum time an item stays buffered before it is flushed.
    pub flush_interval: Duration,
    /// Buffer size in bytes that triggers a flush.
    pub flush_bytes: usize,
    /// Capacity of the queue shared by the workers.
    pub queue_capacity: usize,
    /// Retry policy for bulk requests.
    pub retry: RetryPolicy,
}

impl Default for BulkIndexerConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            flush_interval: Duration::from_secs(1),
            flush_bytes: 5 * 1024 * 1024,
            queue_capacity: 1024,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bulk indexer feeding a `BulkWriteClient` from a pool of workers.
///
/// # Example
///
/// ```ignore
/// let indexer = BulkIndexer::new(client, BulkIndexerConfig::default(), None);
/// indexer.add(BulkItem::index("svc-a-monza-2024-01-01", "doc-1", body)).await?;
/// let stats = indexer.close().await;
/// ```
pub struct BulkIndexer {
    sender: mpsc::Sender<BulkItem>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<StatsCounters>,
}

impl BulkIndexer {
    /// Start the indexer workers.
    ///
    /// Must be called from within a Tokio runtime. A zero worker count or
    /// interval is raised to the smallest usable value.
    pub fn new(
        client: Arc<dyn BulkWriteClient>,
        config: BulkIndexerConfig,
        on_failure: Option<FailureHandler>,
    ) -> Self {
        let num_workers = config.num_workers.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(1));
        let stats = Arc::new(StatsCounters::default());

        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let worker = IndexerWorker {
                id,
                client: client.clone(),
                retry: config.retry.clone(),
                flush_bytes: config.flush_bytes,
                flush_interval,
                stats: stats.clone(),
                on_failure: on_failure.clone(),
                buffer: Vec::new(),
                buffered_bytes: 0,
            };
            workers.push(tokio::spawn(worker.run(receiver.clone())));
        }

        info!(
            num_workers = num_workers,
            flush_interval_ms = flush_interval.as_millis() as u64,
            flush_bytes = config.flush_bytes,
            "Started bulk indexer"
        );

        Self {
            sender,
            workers,
            stats,
        }
    }

    /// Queue an item for indexing.
    ///
    /// Waits while the shared queue is full, which only happens when every
    /// worker is behind.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the item was queued
    /// * `Err(SearchError::IndexerClosed)` - If the workers have stopped
    pub async fn add(&self, item: BulkItem) -> Result<(), SearchError> {
        self.sender
            .send(item)
            .await
            .map_err(|_| SearchError::IndexerClosed)?;
        self.stats.added.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Current counters.
    pub fn stats(&self) -> BulkIndexerStats {
        self.stats.snapshot()
    }

    /// Stop accepting items, flush every buffer and wait for the workers.
    ///
    /// Returns once every outstanding request has completed.
    pub async fn close(self) -> BulkIndexerStats {
        drop(self.sender);

        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Bulk indexer worker failed");
            }
        }

        let stats = self.stats.snapshot();
        info!(
            added = stats.num_added,
            indexed = stats.num_indexed,
            failed = stats.num_failed,
            requests = stats.num_requests,
            "Bulk indexer closed"
        );
        stats
    }
}
