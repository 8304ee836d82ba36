//! Batching worker.
//!
//! The worker is the only reader of the hand-off channel. For every event it
//! assigns an id when none is set, derives the collection and document names
//! and hands the document to the bulk indexer, which owns the batching and
//! flush policy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use monza_opensearch_repository::{BulkIndexer, BulkIndexerStats, BulkItem};
use monza_opensearch_shared::{collection_name, document_id, Event};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::handoff::HandoffMessage;
use crate::observer::{DeliveryFailure, FailureObserver};
use crate::stats::SinkCounters;

/// Lifecycle of the batching worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerState {
    /// Nothing buffered, waiting for events.
    #[default]
    Idle,
    /// Documents are buffered in the bulk indexer awaiting a flush.
    Accumulating,
    /// Shutdown received; queued events are processed and buffers flushed.
    Draining,
    /// The worker has exited.
    Terminal,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Idle => "idle",
            Self::Accumulating => "accumulating",
            Self::Draining => "draining",
            Self::Terminal => "terminal",
        };
        f.write_str(state)
    }
}

/// Final figures of a drained worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Events submitted to the bulk indexer.
    pub processed: u64,
    /// Events the worker failed to submit.
    pub submission_failures: u64,
    /// Bulk indexer counters after its final flush.
    pub indexer: BulkIndexerStats,
}

/// Background task draining the hand-off channel into a `BulkIndexer`.
pub struct BatchingWorker {
    indexer: BulkIndexer,
    prefix: String,
    observer: Option<Arc<dyn FailureObserver>>,
    state: Arc<watch::Sender<WorkerState>>,
    counters: Arc<SinkCounters>,
    idle_check: Duration,
    processed: u64,
    submission_failures: u64,
}

impl BatchingWorker {
    /// Create a worker.
    ///
    /// # Arguments
    ///
    /// * `indexer` - Bulk indexer receiving every document
    /// * `prefix` - Middle segment of collection names
    /// * `idle_check` - How often a buffering worker checks whether the
    ///   indexer has flushed everything and it is idle again
    pub fn new(
        indexer: BulkIndexer,
        prefix: impl Into<String>,
        idle_check: Duration,
        observer: Option<Arc<dyn FailureObserver>>,
    ) -> Self {
        Self {
            indexer,
            prefix: prefix.into(),
            observer,
            state: Arc::new(watch::channel(WorkerState::Idle).0),
            counters: Arc::new(SinkCounters::default()),
            idle_check: idle_check.max(Duration::from_millis(1)),
            processed: 0,
            submission_failures: 0,
        }
    }

    pub(crate) fn with_shared(
        mut self,
        state: Arc<watch::Sender<WorkerState>>,
        counters: Arc<SinkCounters>,
    ) -> Self {
        self.state = state;
        self.counters = counters;
        self
    }

    /// Watch the worker's state.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Spawn the worker on the current runtime.
    pub fn spawn(self, rx: mpsc::Receiver<HandoffMessage>) -> JoinHandle<WorkerReport> {
        tokio::spawn(self.run(rx))
    }

    /// Process messages until a shutdown message arrives or every sender is
    /// gone, then drain and close the bulk indexer.
    #[instrument(skip_all, fields(prefix = %self.prefix))]
    pub async fn run(mut self, mut rx: mpsc::Receiver<HandoffMessage>) -> WorkerReport {
        info!("Batching worker started");

        let mut ticker = tokio::time::interval(self.idle_check);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reply = loop {
            let accumulating = *self.state.borrow() == WorkerState::Accumulating;
            tokio::select! {
                message = rx.recv() => match message {
                    Some(HandoffMessage::Item(event)) => {
                        self.process(event).await;
                        self.set_state(WorkerState::Accumulating);
                    }
                    Some(HandoffMessage::Shutdown(reply)) => break Some(reply),
                    None => {
                        warn!("Hand-off channel closed without shutdown message");
                        break None;
                    }
                },
                _ = ticker.tick(), if accumulating => {
                    if self.indexer.stats().pending() == 0 {
                        self.set_state(WorkerState::Idle);
                    }
                }
            }
        };

        let report = self.drain(rx).await;
        if let Some(reply) = reply {
            // Teardown may have given up waiting.
            let _ = reply.send(report);
        }
        report
    }

    async fn drain(mut self, mut rx: mpsc::Receiver<HandoffMessage>) -> WorkerReport {
        self.set_state(WorkerState::Draining);
        rx.close();

        let mut late = 0u64;
        while let Some(message) = rx.recv().await {
            match message {
                HandoffMessage::Item(event) => {
                    self.process(event).await;
                    late += 1;
                }
                HandoffMessage::Shutdown(reply) => {
                    debug!("Ignoring repeated shutdown message");
                    drop(reply);
                }
            }
        }
        debug!(events = late, "Processed events queued before shutdown");

        let Self {
            indexer,
            state,
            processed,
            submission_failures,
            ..
        } = self;
        let report = WorkerReport {
            processed,
            submission_failures,
            indexer: indexer.close().await,
        };
        transition(&state, WorkerState::Terminal);

        info!(
            processed = report.processed,
            indexed = report.indexer.num_indexed,
            failed = report.indexer.num_failed,
            "Batching worker stopped"
        );
        report
    }

    async fn process(&mut self, mut event: Event) {
        if event.ensure_id() {
            SinkCounters::incr(&self.counters.synthesized);
        }

        let index = collection_name(&event.service_id, &self.prefix);
        let doc_id = document_id(event.id);

        let body = match event.to_json() {
            Ok(body) => body,
            Err(e) => {
                self.submission_failed(index, doc_id, e.to_string());
                return;
            }
        };

        match self.indexer.add(BulkItem::index(index.clone(), doc_id.clone(), body)).await {
            Ok(()) => {
                self.processed += 1;
                SinkCounters::incr(&self.counters.processed);
            }
            Err(e) => self.submission_failed(index, doc_id, e.to_string()),
        }
    }

    fn submission_failed(&mut self, index: String, document_id: String, reason: String) {
        self.submission_failures += 1;
        SinkCounters::incr(&self.counters.submission_failures);
        error!(
            index = %index,
            document_id = %document_id,
            error = %reason,
            "Failed to submit document"
        );

        if let Some(observer) = &self.observer {
            observer.on_failure(DeliveryFailure::Submission {
                index,
                document_id,
                reason,
            });
        }
    }

    fn set_state(&self, next: WorkerState) {
        transition(&self.state, next);
    }
}

fn transition(state: &watch::Sender<WorkerState>, next: WorkerState) {
    let previous = state.send_replace(next);
    if previous != next {
        debug!(from = %previous, to = %next, "Worker state changed");
    }
}
