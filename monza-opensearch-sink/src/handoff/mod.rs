//! Hand-off channel between `record` callers and the batching worker.
//!
//! A bounded `mpsc` channel carries tagged messages. Any number of producers
//! write to it; the worker is its only reader.

use std::time::Duration;

use monza_opensearch_shared::Event;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::observer::DropReason;
use crate::worker::WorkerReport;

/// Message carried by the hand-off channel.
#[derive(Debug)]
pub enum HandoffMessage {
    /// An event to index.
    Item(Event),
    /// Stop accepting events, drain what is queued and answer with the final
    /// report once every buffered document has been flushed.
    Shutdown(oneshot::Sender<WorkerReport>),
}

/// What `record` does when the hand-off channel is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait for room until the caller's token is cancelled.
    #[default]
    Block,
    /// Wait for room at most the given duration, then drop the event.
    BlockWithTimeout(Duration),
    /// Drop the event right away.
    DropNewest,
}

/// An event the channel did not accept.
#[derive(Debug)]
pub struct HandoffRejection {
    pub event: Event,
    pub reason: DropReason,
}

/// Send `event` to the worker under `policy`.
///
/// Room in the channel is reserved before the event is moved into it, so an
/// event that cannot be sent is always handed back to the caller.
///
/// # Returns
///
/// * `Ok(())` - The event is queued for the worker
/// * `Err(HandoffRejection)` - The event with the reason it was not queued
pub async fn hand_off(
    tx: &mpsc::Sender<HandoffMessage>,
    event: Event,
    policy: OverflowPolicy,
    ctx: &CancellationToken,
) -> Result<(), HandoffRejection> {
    match reserve(tx, policy, ctx).await {
        Ok(permit) => {
            permit.send(HandoffMessage::Item(event));
            Ok(())
        }
        Err(reason) => Err(HandoffRejection { event, reason }),
    }
}

async fn reserve<'a>(
    tx: &'a mpsc::Sender<HandoffMessage>,
    policy: OverflowPolicy,
    ctx: &CancellationToken,
) -> Result<mpsc::Permit<'a, HandoffMessage>, DropReason> {
    // The token only matters once the channel is full.
    match tx.try_reserve() {
        Ok(permit) => return Ok(permit),
        Err(mpsc::error::TrySendError::Closed(())) => return Err(DropReason::ShutDown),
        Err(mpsc::error::TrySendError::Full(())) => {}
    }

    match policy {
        OverflowPolicy::DropNewest => Err(DropReason::ChannelFull),
        OverflowPolicy::Block => tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(DropReason::Cancelled),
            permit = tx.reserve() => permit.map_err(|_| DropReason::ShutDown),
        },
        OverflowPolicy::BlockWithTimeout(limit) => tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(DropReason::Cancelled),
            permit = tokio::time::timeout(limit, tx.reserve()) => match permit {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_)) => Err(DropReason::ShutDown),
                Err(_) => Err(DropReason::Timeout),
            },
        },
    }
}
