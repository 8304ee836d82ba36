//! This module defines the core data structures shared by the destination crates.
//! It re-exports the event envelope and the naming helpers.

pub mod event;
pub mod naming;

pub use event::{Event, EventId, ServiceId};
