//! # Monza OpenSearch Shared
//!
//! This crate defines the event envelope that flows from the monza event pipeline
//! into the OpenSearch destination, together with the rules used to derive the
//! destination collection name and document identifier for each event.

pub mod types;

pub use types::event::{Event, EventId, ServiceId};
pub use types::naming::{
    collection_name, collection_name_at, document_id, DEFAULT_COLLECTION_PREFIX,
    DOCUMENT_ID_PREFIX,
};
