//! OpenSearch destination.
//!
//! Owns the worker task and the sending half of the hand-off channel. The
//! lifecycle moves from `Created` to `Running` on a successful `setup` and to
//! `Stopped` on the first `teardown`; it never goes back.

use std::sync::Arc;

use async_trait::async_trait;
use monza_opensearch_repository::{
    BulkFailure, BulkIndexer, BulkWriteClient, FailureHandler, OpenSearchClient,
};
use monza_opensearch_shared::Event;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SinkConfig;
use crate::destination::Destination;
use crate::errors::SinkError;
use crate::handoff::{hand_off, HandoffMessage};
use crate::observer::{DeliveryFailure, DropReason, FailureObserver};
use crate::stats::{SinkCounters, SinkStats};
use crate::worker::{BatchingWorker, WorkerReport, WorkerState};

enum Lifecycle {
    Created,
    Running {
        tx: mpsc::Sender<HandoffMessage>,
        worker: JoinHandle<WorkerReport>,
    },
    Stopped,
}

/// Destination indexing events into daily per-service OpenSearch collections.
///
/// # Example
///
/// ```ignore
/// let ctx = CancellationToken::new();
/// let destination = OpenSearchDestination::new(SinkConfig::default());
///
/// destination.setup(&ctx).await?;
/// destination.record(&ctx, Event::new("billing", json!({"amount": 42}))).await;
/// destination.teardown(&ctx).await;
/// ```
pub struct OpenSearchDestination {
    config: SinkConfig,
    client: Option<Arc<dyn BulkWriteClient>>,
    observer: Option<Arc<dyn FailureObserver>>,
    lifecycle: Mutex<Lifecycle>,
    state: Arc<watch::Sender<WorkerState>>,
    counters: Arc<SinkCounters>,
}

impl OpenSearchDestination {
    /// Create a destination that builds an `OpenSearchClient` during `setup`.
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            client: None,
            observer: None,
            lifecycle: Mutex::new(Lifecycle::Created),
            state: Arc::new(watch::channel(WorkerState::Idle).0),
            counters: Arc::new(SinkCounters::default()),
        }
    }

    /// Create a destination writing through the given client.
    pub fn with_client(config: SinkConfig, client: Arc<dyn BulkWriteClient>) -> Self {
        Self {
            client: Some(client),
            ..Self::new(config)
        }
    }

    /// Report undelivered events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Current state of the batching worker.
    pub fn worker_state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch the batching worker's state.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Current counters.
    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot(self.worker_state())
    }

    /// Stop the worker and wait until every queued event has been flushed.
    ///
    /// Waits at most `drain_timeout`. If the timeout elapses or `ctx` is
    /// cancelled first, the worker is aborted and buffered documents may be
    /// lost.
    ///
    /// # Returns
    ///
    /// * `Ok(WorkerReport)` - The worker's final figures
    /// * `Err(SinkError::ShutdownRaceError)` - If the destination was already torn down
    /// * `Err(SinkError::DrainTimeout)` - If draining took longer than `drain_timeout`
    /// * `Err(SinkError::Cancelled)` - If `ctx` was cancelled while draining
    #[instrument(skip_all)]
    pub async fn drain(&self, ctx: &CancellationToken) -> Result<WorkerReport, SinkError> {
        let previous = std::mem::replace(&mut *self.lifecycle.lock().await, Lifecycle::Stopped);
        let (tx, worker) = match previous {
            Lifecycle::Running { tx, worker } => (tx, worker),
            Lifecycle::Created => {
                info!("Destination torn down before setup");
                self.state.send_replace(WorkerState::Terminal);
                return Ok(WorkerReport::default());
            }
            Lifecycle::Stopped => return Err(SinkError::ShutdownRaceError),
        };

        let timeout = self.config.drain_timeout;
        let (reply_tx, reply_rx) = oneshot::channel();
        let shutdown = async move {
            if tx.send(HandoffMessage::Shutdown(reply_tx)).await.is_err() {
                return Err(SinkError::submission("batching worker is gone"));
            }
            drop(tx);
            reply_rx
                .await
                .map_err(|_| SinkError::submission("batching worker stopped before draining"))
        };

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(SinkError::Cancelled),
            result = tokio::time::timeout(timeout, shutdown) => {
                result.unwrap_or_else(|_| Err(SinkError::DrainTimeout(timeout)))
            }
        };

        match outcome {
            Ok(report) => {
                if let Err(e) = worker.await {
                    error!(error = %e, "Batching worker failed");
                }
                info!(
                    processed = report.processed,
                    indexed = report.indexer.num_indexed,
                    failed = report.indexer.num_failed,
                    requests = report.indexer.num_requests,
                    "Destination drained"
                );
                Ok(report)
            }
            Err(e) => {
                worker.abort();
                self.state.send_replace(WorkerState::Terminal);
                warn!(error = %e, "Batching worker aborted before draining");
                Err(e)
            }
        }
    }

    fn connect(&self) -> Result<Arc<dyn BulkWriteClient>, SinkError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = OpenSearchClient::new(&self.config.opensearch_config())?;
        Ok(Arc::new(client))
    }

    fn failure_handler(&self) -> Option<FailureHandler> {
        let observer = self.observer.clone()?;
        let handler: FailureHandler = Arc::new(move |failure: BulkFailure| {
            observer.on_failure(DeliveryFailure::Rejected(failure));
        });
        Some(handler)
    }

    fn drop_event(&self, event: Event, reason: DropReason) {
        SinkCounters::incr(&self.counters.dropped);
        warn!(
            service_id = %event.service_id,
            event_id = %event.id,
            reason = %reason,
            "Dropping event"
        );

        if let Some(observer) = &self.observer {
            observer.on_failure(DeliveryFailure::Dropped {
                service_id: event.service_id,
                event_id: event.id,
                reason,
            });
        }
    }
}

#[async_trait]
impl Destination for OpenSearchDestination {
    /// Ping the store and start the batching worker.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The worker is running
    /// * `Err(SinkError::ConnectivityError)` - If the client cannot be built or the ping fails
    /// * `Err(SinkError::Cancelled)` - If `ctx` is cancelled while pinging the store
    /// * `Err(SinkError::AlreadyStarted)` - If `setup` already succeeded
    #[instrument(skip_all, fields(addresses = ?self.config.addresses))]
    async fn setup(&self, ctx: &CancellationToken) -> Result<(), SinkError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Running { .. } => return Err(SinkError::AlreadyStarted),
            Lifecycle::Stopped => return Err(SinkError::ShutdownRaceError),
        }

        self.config.validate()?;
        let client = self.connect()?;

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                warn!("Setup cancelled while pinging the store");
                return Err(SinkError::Cancelled);
            }
            result = client.ping() => {
                if let Err(e) = result {
                    error!(error = %e, "OpenSearch is unreachable");
                    return Err(SinkError::connectivity(e.to_string()));
                }
            }
        }

        let indexer = BulkIndexer::new(
            client,
            self.config.bulk_indexer_config(),
            self.failure_handler(),
        );
        let worker = BatchingWorker::new(
            indexer,
            self.config.default_collection_prefix.clone(),
            self.config.flush_interval,
            self.observer.clone(),
        )
        .with_shared(self.state.clone(), self.counters.clone());

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        *lifecycle = Lifecycle::Running {
            tx,
            worker: worker.spawn(rx),
        };

        info!(
            num_workers = self.config.num_workers,
            flush_interval_ms = self.config.flush_interval.as_millis() as u64,
            prefix = %self.config.default_collection_prefix,
            "OpenSearch destination started"
        );
        Ok(())
    }

    async fn record(&self, ctx: &CancellationToken, event: Event) {
        let tx = match &*self.lifecycle.lock().await {
            Lifecycle::Running { tx, .. } => tx.clone(),
            Lifecycle::Created => return self.drop_event(event, DropReason::NotStarted),
            Lifecycle::Stopped => return self.drop_event(event, DropReason::ShutDown),
        };

        match hand_off(&tx, event, self.config.overflow_policy, ctx).await {
            Ok(()) => SinkCounters::incr(&self.counters.recorded),
            Err(rejection) => self.drop_event(rejection.event, rejection.reason),
        }
    }

    async fn teardown(&self, ctx: &CancellationToken) {
        match self.drain(ctx).await {
            Ok(report) => debug!(processed = report.processed, "Teardown complete"),
            Err(SinkError::ShutdownRaceError) => debug!("Destination already torn down"),
            Err(e) => warn!(error = %e, "Teardown did not drain cleanly"),
        }
    }
}
