//! Delivery failure reporting.
//!
//! `record` never returns an error. Embedding systems that need retries or
//! dead-lettering register a `FailureObserver` and receive every event the
//! destination could not deliver.

use std::fmt;

use monza_opensearch_repository::BulkFailure;
use monza_opensearch_shared::{EventId, ServiceId};
use tokio::sync::mpsc;

/// Why an event never reached the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The hand-off channel was full under `OverflowPolicy::DropNewest`.
    ChannelFull,
    /// The hand-off channel stayed full past the overflow timeout.
    Timeout,
    /// The caller's token fired while waiting for room in the channel.
    Cancelled,
    /// `record` was called before a successful `setup`.
    NotStarted,
    /// `record` was called after `teardown`.
    ShutDown,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::ChannelFull => "hand-off channel full",
            Self::Timeout => "timed out waiting for hand-off channel",
            Self::Cancelled => "cancelled while waiting for hand-off channel",
            Self::NotStarted => "destination not started",
            Self::ShutDown => "destination torn down",
        };
        f.write_str(reason)
    }
}

/// An event that was not delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryFailure {
    /// The document could not be handed to the bulk indexer.
    Submission {
        index: String,
        document_id: String,
        reason: String,
    },
    /// The store rejected the document, or its bulk request failed for good.
    Rejected(BulkFailure),
    /// The event was dropped before reaching the worker.
    Dropped {
        service_id: ServiceId,
        event_id: EventId,
        reason: DropReason,
    },
}

/// Receives every delivery failure of a destination.
///
/// Called from the worker and bulk indexer tasks, so implementations must not
/// block.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, failure: DeliveryFailure);
}

impl FailureObserver for mpsc::UnboundedSender<DeliveryFailure> {
    fn on_failure(&self, failure: DeliveryFailure) {
        // The receiver going away only means nobody listens anymore.
        let _ = self.send(failure);
    }
}

/// Adapts a closure into a `FailureObserver`.
///
/// # Example
///
/// ```ignore
/// let destination = OpenSearchDestination::new(SinkConfig::default())
///     .with_observer(Arc::new(FnObserver(|failure| eprintln!("{:?}", failure))));
/// ```
pub struct FnObserver<F>(pub F);

impl<F> FailureObserver for FnObserver<F>
where
    F: Fn(DeliveryFailure) + Send + Sync,
{
    fn on_failure(&self, failure: DeliveryFailure) {
        (self.0)(failure)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn dropped() -> DeliveryFailure {
        DeliveryFailure::Dropped {
            service_id: ServiceId::new("svc-a"),
            event_id: EventId::new(7),
            reason: DropReason::ChannelFull,
        }
    }

    #[test]
    fn test_unbounded_sender_forwards_failures() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tx.on_failure(dropped());

        assert_eq!(rx.try_recv().unwrap(), dropped());
    }

    #[test]
    fn test_unbounded_sender_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        tx.on_failure(dropped());
    }

    #[test]
    fn test_fn_observer_calls_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = FnObserver(move |failure: DeliveryFailure| {
            sink.lock().unwrap().push(failure);
        });

        observer.on_failure(dropped());

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_reason_display() {
        assert_eq!(DropReason::ShutDown.to_string(), "destination torn down");
    }
}
