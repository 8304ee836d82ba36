//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `BulkWriteClient`
//! using the OpenSearch Rust client.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cert::CertificateValidation,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OpenSearchConfig;
use crate::errors::SearchError;
use crate::interfaces::BulkWriteClient;
use crate::opensearch::bulk_body::{build_bulk_body, parse_bulk_response};
use crate::types::{BulkItem, BulkResponse};

/// A single cluster node and its transport.
struct Node {
    url: Url,
    client: OpenSearch,
}

/// OpenSearch client implementation.
///
/// Holds one transport per configured address and spreads bulk requests over
/// them round-robin.
///
/// # Example
///
/// ```ignore
/// use monza_opensearch_repository::{BulkItem, BulkWriteClient, OpenSearchClient, OpenSearchConfig};
///
/// let client = OpenSearchClient::new(&OpenSearchConfig::default())?;
/// client.ping().await?;
///
/// let items = vec![BulkItem::index("svc-a-monza-2024-01-01", "doc-1", r#"{"id":1}"#)];
/// let response = client.bulk(&items).await?;
/// ```
pub struct OpenSearchClient {
    nodes: Vec<Node>,
    next: AtomicUsize,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the configured addresses.
    ///
    /// No request is sent; use `ping` to verify connectivity.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If no address is configured, an address is blank
    ///   or not a valid URL, or a transport cannot be built
    pub fn new(config: &OpenSearchConfig) -> Result<Self, SearchError> {
        if config.addresses.is_empty() {
            return Err(SearchError::connection("No OpenSearch address configured"));
        }

        let mut nodes = Vec::with_capacity(config.addresses.len());
        for address in &config.addresses {
            let address = address.trim();
            if address.is_empty() {
                return Err(SearchError::connection("Blank OpenSearch address configured"));
            }
            let url = Url::parse(address)
                .map_err(|e| SearchError::connection(format!("Invalid address {}: {}", address, e)))?;

            let conn_pool = SingleNodeConnectionPool::new(url.clone());
            let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
            if let Some(timeout) = config.request_timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(auth) = &config.basic_auth {
                builder = builder.auth(Credentials::Basic(
                    auth.username.clone(),
                    auth.password.clone(),
                ));
            }
            if config.skip_cert_validation {
                builder = builder.cert_validation(CertificateValidation::None);
            }
            let transport = builder
                .build()
                .map_err(|e| SearchError::connection(e.to_string()))?;

            nodes.push(Node {
                url,
                client: OpenSearch::new(transport),
            });
        }

        info!(
            nodes = nodes.len(),
            authenticated = config.basic_auth.is_some(),
            skip_cert_validation = config.skip_cert_validation,
            "Created OpenSearch client"
        );

        Ok(Self {
            nodes,
            next: AtomicUsize::new(0),
        })
    }

    /// Number of configured nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn next_node(&self) -> &Node {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
        &self.nodes[index]
    }
}

#[async_trait]
impl BulkWriteClient for OpenSearchClient {
    /// Ping every node in turn until one answers.
    async fn ping(&self) -> Result<(), SearchError> {
        let mut last_error = None;

        for node in &self.nodes {
            match node.client.ping().send().await {
                Ok(response) if response.status_code().is_success() => {
                    debug!(url = %node.url, "OpenSearch node answered ping");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status_code().as_u16();
                    warn!(url = %node.url, status = status, "OpenSearch ping rejected");
                    last_error = Some(SearchError::status(status, "ping rejected"));
                }
                Err(e) => {
                    warn!(url = %node.url, error = %e, "OpenSearch node unreachable");
                    last_error = Some(SearchError::connection(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SearchError::connection("No OpenSearch node reachable")))
    }

    async fn bulk(&self, items: &[BulkItem]) -> Result<BulkResponse, SearchError> {
        if items.is_empty() {
            return Ok(BulkResponse::default());
        }

        let node = self.next_node();
        let body = build_bulk_body(items);

        let response = node
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(url = %node.url, status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::status(status.as_u16(), error_body));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let parsed = parse_bulk_response(&response_body)?;
        debug!(
            url = %node.url,
            items = parsed.items.len(),
            took_ms = parsed.took,
            errors = parsed.errors,
            "Bulk request completed"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasicAuth;

    #[test]
    fn test_new_requires_addresses() {
        let config = OpenSearchConfig::with_addresses(Vec::<String>::new());

        let result = OpenSearchClient::new(&config);

        assert!(matches!(result, Err(SearchError::ConnectionError(_))));
    }

    #[test]
    fn test_new_rejects_invalid_address() {
        let config = OpenSearchConfig::with_addresses(["not a url"]);

        let result = OpenSearchClient::new(&config);

        assert!(matches!(result, Err(SearchError::ConnectionError(_))));
    }

    #[test]
    fn test_new_rejects_blank_address() {
        for addresses in [vec![""], vec!["   "], vec!["http://node-a:9200", " "]] {
            let config = OpenSearchConfig::with_addresses(addresses);

            let result = OpenSearchClient::new(&config);

            assert!(matches!(result, Err(SearchError::ConnectionError(_))));
        }
    }

    #[test]
    fn test_new_with_basic_auth_and_no_cert_validation() {
        let config = OpenSearchConfig::with_addresses(["https://node-a:9200"])
            .with_basic_auth(BasicAuth::new("admin", "admin"))
            .with_skip_cert_validation(true);

        let client = OpenSearchClient::new(&config).unwrap();

        assert_eq!(client.node_count(), 1);
    }

    #[test]
    fn test_round_robin_over_nodes() {
        let config = OpenSearchConfig::with_addresses(["http://node-a:9200", "http://node-b:9200"]);
        let client = OpenSearchClient::new(&config).unwrap();

        let first = client.next_node().url.clone();
        let second = client.next_node().url.clone();
        let third = client.next_node().url.clone();

        assert_eq!(client.node_count(), 2);
        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[tokio::test]
    async fn test_bulk_with_no_items_sends_nothing() {
        let config = OpenSearchConfig::with_addresses(["http://127.0.0.1:1"]);
        let client = OpenSearchClient::new(&config).unwrap();

        let response = client.bulk(&[]).await.unwrap();

        assert!(response.items.is_empty());
    }
}
