//! Interface definitions for the bulk write client.
//!
//! This module defines the abstract `BulkWriteClient` trait that allows
//! for dependency injection and swappable store implementations.

mod bulk_write_client;

pub use bulk_write_client::BulkWriteClient;
