//! Bulk indexer worker.
//!
//! Each worker owns a buffer fed from the shared queue and flushes it when the
//! buffer reaches the byte threshold, when the flush interval elapses, or when
//! the queue closes.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, instrument};

use crate::bulk_indexer::stats::StatsCounters;
use crate::bulk_indexer::FailureHandler;
use crate::interfaces::BulkWriteClient;
use crate::retry::RetryPolicy;
use crate::types::{BulkFailure, BulkItem};

pub(crate) struct IndexerWorker {
    pub(crate) id: usize,
    pub(crate) client: Arc<dyn BulkWriteClient>,
    pub(crate) retry: RetryPolicy,
    pub(crate) flush_bytes: usize,
    pub(crate) flush_interval: Duration,
    pub(crate) stats: Arc<StatsCounters>,
    pub(crate) on_failure: Option<FailureHandler>,
    pub(crate) buffer: Vec<BulkItem>,
    pub(crate) buffered_bytes: usize,
}

impl IndexerWorker {
    #[instrument(skip(self, items), fields(worker = self.id))]
    pub(crate) async fn run(mut self, items: Arc<Mutex<mpsc::Receiver<BulkItem>>>) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.flush_interval,
            self.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // The lock is only held while waiting for the next item.
                item = async { items.lock().await.recv().await } => match item {
                    Some(item) => {
                        self.buffered_bytes += item.encoded_len();
                        self.buffer.push(item);
                        if self.buffered_bytes >= self.flush_bytes {
                            self.flush().await;
                        }
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }

        debug!("Bulk indexer worker stopped");
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.buffer);
        self.buffered_bytes = 0;
        let count = batch.len() as u64;

        debug!(count = count, "Flushing bulk batch");

        let client = &self.client;
        let stats = &self.stats;
        let items = &batch[..];
        let result = self
            .retry
            .run(move || {
                stats.requests.fetch_add(1, Ordering::Relaxed);
                client.bulk(items)
            })
            .await;

        self.stats.flushed.fetch_add(count, Ordering::Relaxed);

        match result {
            Ok(response) => {
                let succeeded = response.succeeded() as u64;
                self.stats.indexed.fetch_add(succeeded, Ordering::Relaxed);

                // Items the store did not answer for are failures too.
                let missing = batch.get(response.items.len()..).unwrap_or_default();
                for item in missing {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        index = %item.index,
                        document_id = %item.document_id,
                        "Document missing from bulk response"
                    );
                    self.report(BulkFailure {
                        index: item.index.clone(),
                        document_id: item.document_id.clone(),
                        status: None,
                        reason: "missing from bulk response".to_string(),
                    });
                }

                for outcome in response.failures() {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    let reason = outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("rejected with status {}", outcome.status));
                    error!(
                        index = %outcome.index,
                        document_id = %outcome.document_id,
                        status = outcome.status,
                        reason = %reason,
                        "Document rejected by the store"
                    );
                    self.report(BulkFailure {
                        index: outcome.index.clone(),
                        document_id: outcome.document_id.clone(),
                        status: Some(outcome.status),
                        reason,
                    });
                }

                debug!(count = count, indexed = succeeded, "Bulk batch flushed");
            }
            Err(e) => {
                self.stats.failed.fetch_add(count, Ordering::Relaxed);
                error!(error = %e, count = count, "Failed to flush bulk batch after retries");

                for item in batch {
                    self.report(BulkFailure {
                        index: item.index,
                        document_id: item.document_id,
                        status: e.status_code(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn report(&self, failure: BulkFailure) {
        if let Some(handler) = &self.on_failure {
            handler(failure);
        }
    }
}
