//! Request and response types for bulk write operations.

use serde::{Deserialize, Serialize};

/// Action performed for a bulk item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    /// Create or replace the document with the given id.
    #[default]
    Index,
    /// Create the document, failing if it already exists.
    Create,
}

impl BulkAction {
    /// Name of the action in the bulk API.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Create => "create",
        }
    }
}

/// A single document submitted to the bulk API.
///
/// `body` holds the serialized JSON document. It must be a single line, which
/// `serde_json::to_string` guarantees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    /// Destination collection (index) name.
    pub index: String,
    /// Bulk action, `index` for the destination.
    pub action: BulkAction,
    /// Document identifier within the collection.
    pub document_id: String,
    /// Serialized document body.
    pub body: String,
}

impl BulkItem {
    /// Create an `index` item.
    pub fn index(
        index: impl Into<String>,
        document_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            action: BulkAction::Index,
            document_id: document_id.into(),
            body: body.into(),
        }
    }

    /// Approximate number of bytes this item adds to a bulk request body.
    ///
    /// Used by the bulk indexer's size-based flush trigger.
    pub fn encoded_len(&self) -> usize {
        // action line: {"index":{"_index":"..","_id":".."}}\n plus body\n
        self.action.as_str().len()
            + self.index.len()
            + self.document_id.len()
            + self.body.len()
            + 30
    }
}

/// Outcome of a single item inside a bulk response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemOutcome {
    pub index: String,
    pub document_id: String,
    /// HTTP-like status reported for the item.
    pub status: u16,
    /// Error reason if the item was rejected.
    pub error: Option<String>,
}

impl BulkItemOutcome {
    /// Returns true if the store accepted the item.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// Parsed response of a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Time the store spent on the request, in milliseconds.
    pub took: u64,
    /// Whether the store flagged any item as failed.
    pub errors: bool,
    /// Per-item outcomes, in request order.
    pub items: Vec<BulkItemOutcome>,
}

impl BulkResponse {
    /// Number of accepted items.
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    /// Items the store rejected.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.items.iter().filter(|item| !item.is_success())
    }
}

/// A document that could not be written, as reported to failure handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub index: String,
    pub document_id: String,
    /// Item or request status, if the store answered at all.
    pub status: Option<u16>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_outcome_success() {
        let ok = BulkItemOutcome {
            index: "svc-a-monza-2024-01-01".to_string(),
            document_id: "doc-1".to_string(),
            status: 201,
            error: None,
        };
        let rejected = BulkItemOutcome {
            status: 400,
            error: Some("mapper_parsing_exception".to_string()),
            ..ok.clone()
        };

        assert!(ok.is_success());
        assert!(!rejected.is_success());

        let response = BulkResponse {
            took: 3,
            errors: true,
            items: vec![ok, rejected],
        };
        assert_eq!(response.succeeded(), 1);
        assert_eq!(response.failures().count(), 1);
    }

    #[test]
    fn test_encoded_len_grows_with_body() {
        let small = BulkItem::index("idx", "doc-1", "{}");
        let large = BulkItem::index("idx", "doc-1", "{\"payload\":\"0123456789\"}");

        assert!(large.encoded_len() > small.encoded_len());
        assert_eq!(small.action, BulkAction::Index);
    }
}
