//! Event envelope types.
//!
//! This module defines the unit of data handed from the monza pipeline to the
//! OpenSearch destination.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier of an event.
///
/// Zero means "unset": the destination synthesizes a value before the event is
/// written so that every stored document carries a non-zero id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// The unset id.
    pub const UNSET: EventId = EventId(0);

    /// Wrap a raw id.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }

    /// Returns true if no id has been assigned yet.
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }

    /// Synthesize a fresh, positive, non-zero id.
    ///
    /// 63 bits of a random v4 UUID are combined with the current unix time in
    /// seconds. Collisions between concurrently synthesized ids are as unlikely
    /// as a 63-bit random collision.
    pub fn synthesize() -> Self {
        loop {
            let (high, low) = Uuid::new_v4().as_u64_pair();
            let random = ((high ^ low) >> 1) as i64;
            let raw = random.wrapping_add(Utc::now().timestamp()) & i64::MAX;
            if raw != 0 {
                return Self(raw);
            }
        }
    }
}

impl From<i64> for EventId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of the service that produced an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An application event on its way to the search store.
///
/// The whole envelope is serialized as the document body.
///
/// # Example
///
/// ```
/// use monza_opensearch_shared::Event;
/// use serde_json::json;
///
/// let mut event = Event::new("billing", json!({"amount": 42}));
/// assert!(event.id.is_unset());
/// assert!(event.ensure_id());
/// assert!(!event.id.is_unset());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: EventId,
    pub service_id: ServiceId,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    /// Create an event with an unset id.
    pub fn new(service_id: impl Into<ServiceId>, payload: Value) -> Self {
        Self {
            id: EventId::UNSET,
            service_id: service_id.into(),
            payload,
        }
    }

    /// Set an explicit id.
    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = id.into();
        self
    }

    /// Assign a synthesized id if none is set.
    ///
    /// Returns true if an id was synthesized. Explicit ids are never replaced.
    pub fn ensure_id(&mut self) -> bool {
        if self.id.is_unset() {
            self.id = EventId::synthesize();
            true
        } else {
            false
        }
    }

    /// Serialize the envelope into the JSON document body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
