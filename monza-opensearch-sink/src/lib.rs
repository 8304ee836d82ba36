//! # Monza OpenSearch Sink
//!
//! This crate provides the monza destination that forwards application events
//! into OpenSearch with asynchronous batched writes.
//!
//! ## Architecture
//!
//! The sink follows a Hand-off / Worker / Indexer pattern:
//!
//! 1. **Destination**: The `setup` / `record` / `teardown` lifecycle exposed to the pipeline
//! 2. **Hand-off**: A bounded channel carrying events and the shutdown signal
//! 3. **Worker**: Assigns ids, derives collection names and submits documents
//! 4. **Bulk indexer**: Buffers documents and flushes them to the store

pub mod config;
pub mod destination;
pub mod errors;
pub mod handoff;
pub mod observer;
mod stats;
pub mod worker;

pub use config::SinkConfig;
pub use destination::{Destination, OpenSearchDestination, SinkStats};
pub use errors::SinkError;
pub use handoff::{hand_off, HandoffMessage, HandoffRejection, OverflowPolicy};
pub use observer::{DeliveryFailure, DropReason, FailureObserver, FnObserver};
pub use worker::{BatchingWorker, WorkerReport, WorkerState};

pub use monza_opensearch_repository::BasicAuth;
pub use monza_opensearch_shared::{Event, EventId, ServiceId};
pub use tokio_util::sync::CancellationToken;
