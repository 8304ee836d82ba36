//! Dependency initialization and wiring for the relay.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use monza_opensearch_sink::{OpenSearchDestination, SinkConfig};
use tracing::info;

use crate::RelayError;

/// Comma separated store endpoints.
pub const ENV_ADDRESSES: &str = "OPENSEARCH_ADDRESSES";
/// Maximum retries per bulk request.
pub const ENV_MAX_RETRIES: &str = "OPENSEARCH_MAX_RETRIES";
/// Concurrent bulk senders.
pub const ENV_NUM_WORKERS: &str = "OPENSEARCH_NUM_WORKERS";
/// Flush interval in milliseconds.
pub const ENV_FLUSH_INTERVAL_MS: &str = "OPENSEARCH_FLUSH_INTERVAL_MS";
/// Collection prefix.
pub const ENV_INDEX_PREFIX: &str = "OPENSEARCH_INDEX_PREFIX";
/// Hand-off channel capacity.
pub const ENV_CHANNEL_CAPACITY: &str = "MONZA_CHANNEL_CAPACITY";
/// Basic authentication username.
pub const ENV_USERNAME: &str = "OPENSEARCH_USERNAME";
/// Basic authentication password.
pub const ENV_PASSWORD: &str = "OPENSEARCH_PASSWORD";
/// Set to `true` to accept any server certificate.
pub const ENV_INSECURE_SKIP_VERIFY: &str = "OPENSEARCH_INSECURE_SKIP_VERIFY";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured destination, not yet set up.
    pub destination: OpenSearchDestination,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_ADDRESSES`: Comma separated endpoints (default: http://localhost:9200)
    /// - `OPENSEARCH_MAX_RETRIES`: Retries per bulk request (default: 5)
    /// - `OPENSEARCH_NUM_WORKERS`: Concurrent bulk senders (default: 4)
    /// - `OPENSEARCH_FLUSH_INTERVAL_MS`: Flush interval (default: 1000)
    /// - `OPENSEARCH_INDEX_PREFIX`: Collection prefix (default: monza)
    /// - `MONZA_CHANNEL_CAPACITY`: Hand-off channel capacity (default: 1024)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: Basic authentication (default: none)
    /// - `OPENSEARCH_INSECURE_SKIP_VERIFY`: Skip certificate validation (default: false)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(RelayError)` - If a variable holds an invalid value
    pub fn from_env() -> Result<Self, RelayError> {
        let config = sink_config_from(|key| env::var(key).ok())?;

        info!(
            addresses = ?config.addresses,
            num_workers = config.num_workers,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            prefix = %config.default_collection_prefix,
            authenticated = config.basic_auth.is_some(),
            "Initializing dependencies"
        );

        Ok(Self {
            destination: OpenSearchDestination::new(config),
        })
    }
}

/// Build a `SinkConfig` from a variable lookup, starting from the defaults.
pub fn sink_config_from<F>(lookup: F) -> Result<SinkConfig, RelayError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = SinkConfig::default();

    if let Some(addresses) = lookup(ENV_ADDRESSES) {
        let addresses: Vec<String> = addresses
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
        if addresses.is_empty() {
            return Err(RelayError::config(format!("{} is empty", ENV_ADDRESSES)));
        }
        config = config.with_addresses(addresses);
    }
    if let Some(retries) = parse(&lookup, ENV_MAX_RETRIES)? {
        config = config.with_max_retries(retries);
    }
    if let Some(workers) = parse(&lookup, ENV_NUM_WORKERS)? {
        config = config.with_num_workers(workers);
    }
    if let Some(millis) = parse(&lookup, ENV_FLUSH_INTERVAL_MS)? {
        config = config.with_flush_interval(Duration::from_millis(millis));
    }
    if let Some(prefix) = lookup(ENV_INDEX_PREFIX) {
        config = config.with_collection_prefix(prefix);
    }
    if let Some(capacity) = parse(&lookup, ENV_CHANNEL_CAPACITY)? {
        config = config.with_channel_capacity(capacity);
    }
    match (lookup(ENV_USERNAME), lookup(ENV_PASSWORD)) {
        (Some(username), Some(password)) => {
            config = config.with_basic_auth(username, password);
        }
        (None, None) => {}
        _ => {
            return Err(RelayError::config(format!(
                "{} and {} must be set together",
                ENV_USERNAME, ENV_PASSWORD
            )));
        }
    }
    if let Some(skip) = parse(&lookup, ENV_INSECURE_SKIP_VERIFY)? {
        config = config.with_skip_cert_validation(skip);
    }

    config
        .validate()
        .map_err(|e| RelayError::config(e.to_string()))?;
    Ok(config)
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, RelayError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| RelayError::config(format!("Invalid {} {:?}: {}", key, raw, e)))
        })
        .transpose()
}
