#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use monza_opensearch_repository::{
    BulkItem, BulkItemOutcome, BulkResponse, BulkWriteClient, SearchError,
};

/// How the store answers pings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingBehavior {
    Up,
    Down,
    Hang,
}

/// In-memory document store keyed by collection then document id.
pub struct InMemoryStore {
    ping: PingBehavior,
    documents: Mutex<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    rejected: Mutex<HashSet<String>>,
    hang_writes: bool,
    pub bulk_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_ping(PingBehavior::Up)
    }

    pub fn with_ping(ping: PingBehavior) -> Self {
        Self {
            ping,
            documents: Mutex::new(BTreeMap::new()),
            rejected: Mutex::new(HashSet::new()),
            hang_writes: false,
            bulk_calls: AtomicUsize::new(0),
        }
    }

    /// Never answer bulk requests.
    pub fn hang_writes(mut self) -> Self {
        self.hang_writes = true;
        self
    }

    /// Reject every write of `document_id` with a mapping error.
    pub fn reject(&self, document_id: &str) {
        self.rejected.lock().unwrap().insert(document_id.to_string());
    }

    pub fn collections(&self) -> Vec<String> {
        self.documents.lock().unwrap().keys().cloned().collect()
    }

    pub fn document_ids(&self, collection: &str) -> Vec<String> {
        self.documents
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn document(&self, collection: &str, document_id: &str) -> Option<serde_json::Value> {
        self.documents
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(document_id).cloned())
    }

    pub fn total_documents(&self) -> usize {
        self.documents.lock().unwrap().values().map(|docs| docs.len()).sum()
    }
}

#[async_trait]
impl BulkWriteClient for InMemoryStore {
    async fn ping(&self) -> Result<(), SearchError> {
        match self.ping {
            PingBehavior::Up => Ok(()),
            PingBehavior::Down => Err(SearchError::connection("connection refused")),
            PingBehavior::Hang => std::future::pending().await,
        }
    }

    async fn bulk(&self, items: &[BulkItem]) -> Result<BulkResponse, SearchError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_writes {
            std::future::pending::<()>().await;
        }
        let rejected = self.rejected.lock().unwrap().clone();
        let mut documents = self.documents.lock().unwrap();

        let outcomes = items
            .iter()
            .map(|item| {
                if rejected.contains(&item.document_id) {
                    return BulkItemOutcome {
                        index: item.index.clone(),
                        document_id: item.document_id.clone(),
                        status: 400,
                        error: Some("mapper_parsing_exception".to_string()),
                    };
                }

                let body = serde_json::from_str(&item.body).unwrap_or(serde_json::Value::Null);
                documents
                    .entry(item.index.clone())
                    .or_default()
                    .insert(item.document_id.clone(), body);
                BulkItemOutcome {
                    index: item.index.clone(),
                    document_id: item.document_id.clone(),
                    status: 201,
                    error: None,
                }
            })
            .collect::<Vec<_>>();

        Ok(BulkResponse {
            took: 1,
            errors: outcomes.iter().any(|o| !o.is_success()),
            items: outcomes,
        })
    }
}
