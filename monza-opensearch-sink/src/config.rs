//! Configuration for the OpenSearch destination.

use std::time::Duration;

use monza_opensearch_repository::{
    config::DEFAULT_ADDRESS,
    retry::{DEFAULT_BACKOFF_STEP, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_ON_STATUS},
    BasicAuth, BulkIndexerConfig, OpenSearchConfig, RetryBackoff, RetryPolicy,
};
use monza_opensearch_shared::DEFAULT_COLLECTION_PREFIX;

use crate::errors::SinkError;
use crate::handoff::OverflowPolicy;

/// Configuration for `OpenSearchDestination`.
///
/// `Default` gives a single local endpoint, retries on 429/502/503/504 with a
/// linear backoff of `attempt * 100ms`, five retries, four bulk workers, a one
/// second flush interval and the `monza` collection prefix.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Endpoint URIs of the store.
    pub addresses: Vec<String>,
    /// HTTP statuses that trigger a retry of a bulk request.
    pub retry_on_status: Vec<u16>,
    /// Delay before each retry.
    pub retry_backoff: RetryBackoff,
    /// Maximum number of retries per bulk request.
    pub max_retries: u32,
    /// Number of concurrent bulk senders.
    pub num_workers: usize,
    /// Maximum time a document stays buffered before being flushed.
    pub flush_interval: Duration,
    /// Buffered size in bytes that forces a flush.
    pub flush_bytes: usize,
    /// Middle segment of every collection name.
    pub default_collection_prefix: String,
    /// Capacity of the hand-off channel.
    pub channel_capacity: usize,
    /// What `record` does when the hand-off channel is full.
    pub overflow_policy: OverflowPolicy,
    /// Upper bound on how long `teardown` waits for the worker to drain.
    pub drain_timeout: Duration,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Option<Duration>,
    /// Credentials for HTTP basic authentication.
    pub basic_auth: Option<BasicAuth>,
    /// Accept any server certificate on `https` addresses.
    pub skip_cert_validation: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            addresses: vec![DEFAULT_ADDRESS.to_string()],
            retry_on_status: DEFAULT_RETRY_ON_STATUS.to_vec(),
            retry_backoff: RetryBackoff::linear(DEFAULT_BACKOFF_STEP),
            max_retries: DEFAULT_MAX_RETRIES,
            num_workers: 4,
            flush_interval: Duration::from_secs(1),
            flush_bytes: 5 * 1024 * 1024,
            default_collection_prefix: DEFAULT_COLLECTION_PREFIX.to_string(),
            channel_capacity: 1024,
            overflow_policy: OverflowPolicy::default(),
            drain_timeout: Duration::from_secs(30),
            request_timeout: None,
            basic_auth: None,
            skip_cert_validation: false,
        }
    }
}

impl SinkConfig {
    /// Set the store addresses.
    pub fn with_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Set the statuses that trigger a retry.
    pub fn with_retry_on_status(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_on_status = statuses.into();
        self
    }

    /// Set the retry backoff.
    pub fn with_retry_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the number of bulk workers.
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the flush interval.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the flush size threshold.
    pub fn with_flush_bytes(mut self, bytes: usize) -> Self {
        self.flush_bytes = bytes;
        self
    }

    /// Set the collection prefix.
    pub fn with_collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_collection_prefix = prefix.into();
        self
    }

    /// Set the hand-off channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the overflow policy.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set the drain timeout.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Authenticate with a username and password.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    /// Turn off server certificate validation.
    pub fn with_skip_cert_validation(mut self, skip: bool) -> Self {
        self.skip_cert_validation = skip;
        self
    }

    /// Check the configuration for values the destination cannot run with.
    ///
    /// Addresses are checked when the client is built, so a bad address fails
    /// `setup` with a connectivity error.
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.num_workers == 0 {
            return Err(SinkError::config("num_workers must be greater than zero"));
        }
        if self.flush_interval.is_zero() {
            return Err(SinkError::config("flush_interval must be greater than zero"));
        }
        if self.channel_capacity == 0 {
            return Err(SinkError::config("channel_capacity must be greater than zero"));
        }
        if self.default_collection_prefix.is_empty() {
            return Err(SinkError::config("collection prefix must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn opensearch_config(&self) -> OpenSearchConfig {
        let mut config = OpenSearchConfig::with_addresses(self.addresses.iter().cloned())
            .with_skip_cert_validation(self.skip_cert_validation);
        if let Some(timeout) = self.request_timeout {
            config = config.with_request_timeout(timeout);
        }
        if let Some(auth) = &self.basic_auth {
            config = config.with_basic_auth(auth.clone());
        }
        config
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_on_status: self.retry_on_status.clone(),
            backoff: self.retry_backoff.clone(),
            max_retries: self.max_retries,
        }
    }

    pub(crate) fn bulk_indexer_config(&self) -> BulkIndexerConfig {
        BulkIndexerConfig {
            num_workers: self.num_workers,
            flush_interval: self.flush_interval,
            flush_bytes: self.flush_bytes,
            retry: self.retry_policy(),
            ..BulkIndexerConfig::default()
        }
    }
}
