//! OpenSearch implementation of the bulk write client.
//!
//! This module provides a concrete implementation of `BulkWriteClient`
//! using OpenSearch as the backend.

mod bulk_body;
mod client;

pub use client::OpenSearchClient;
