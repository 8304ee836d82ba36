//! Naming rules for destination collections and documents.

use chrono::{NaiveDate, Utc};

use crate::types::event::{EventId, ServiceId};

/// Collection prefix used when none is configured.
pub const DEFAULT_COLLECTION_PREFIX: &str = "monza";

/// Prefix of every document identifier.
pub const DOCUMENT_ID_PREFIX: &str = "doc-";

/// Collection name for `service_id` on `date`: `{service_id}-{prefix}-{YYYY-MM-DD}`.
pub fn collection_name_at(service_id: &ServiceId, prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}-{}", service_id, prefix, date.format("%Y-%m-%d"))
}

/// Collection name using the current UTC date.
///
/// Call this when the document is handed to the bulk client, not when the
/// event is enqueued.
pub fn collection_name(service_id: &ServiceId, prefix: &str) -> String {
    collection_name_at(service_id, prefix, Utc::now().date_naive())
}

/// Document identifier for an event id: `doc-{id}`.
pub fn document_id(id: EventId) -> String {
    format!("{}{}", DOCUMENT_ID_PREFIX, id)
}
