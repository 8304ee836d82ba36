//! Destination lifecycle exposed to the event pipeline.

mod opensearch_destination;

use async_trait::async_trait;
use monza_opensearch_shared::Event;
use tokio_util::sync::CancellationToken;

use crate::errors::SinkError;

pub use crate::stats::SinkStats;
pub use opensearch_destination::OpenSearchDestination;

/// Capability set every pipeline destination implements.
///
/// `setup` must succeed before events are recorded. `record` is
/// fire-and-forget: events that cannot be delivered are logged and reported to
/// a failure observer, never returned to the caller.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Check connectivity and start delivering.
    async fn setup(&self, ctx: &CancellationToken) -> Result<(), SinkError>;

    /// Hand an event over for delivery.
    async fn record(&self, ctx: &CancellationToken, event: Event);

    /// Stop accepting events and flush what is buffered.
    async fn teardown(&self, ctx: &CancellationToken);
}
