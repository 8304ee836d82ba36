//! Counters kept by the destination and its worker.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::worker::WorkerState;

/// Snapshot of a destination's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    /// Events accepted into the hand-off channel.
    pub recorded: u64,
    /// Events dropped before reaching the worker.
    pub dropped: u64,
    /// Events submitted to the bulk indexer by the worker.
    pub processed: u64,
    /// Events that received a synthesized id.
    pub ids_synthesized: u64,
    /// Events the worker failed to submit.
    pub submission_failures: u64,
    /// Current state of the worker.
    pub worker_state: WorkerState,
}

#[derive(Debug, Default)]
pub(crate) struct SinkCounters {
    pub(crate) recorded: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) processed: AtomicU64,
    pub(crate) synthesized: AtomicU64,
    pub(crate) submission_failures: AtomicU64,
}

impl SinkCounters {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, worker_state: WorkerState) -> SinkStats {
        SinkStats {
            recorded: self.recorded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            ids_synthesized: self.synthesized.load(Ordering::Relaxed),
            submission_failures: self.submission_failures.load(Ordering::Relaxed),
            worker_state,
        }
    }
}
