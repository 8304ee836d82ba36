//! Configuration types for the OpenSearch client.

use std::fmt;
use std::time::Duration;

/// Default OpenSearch endpoint.
pub const DEFAULT_ADDRESS: &str = "http://localhost:9200";

/// Connection settings for the OpenSearch client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchConfig {
    /// Endpoint URIs of the cluster nodes. Requests are spread round-robin.
    pub addresses: Vec<String>,
    /// Timeout applied to every HTTP request. `None` keeps the transport default.
    pub request_timeout: Option<Duration>,
    /// Basic authentication sent with every request.
    pub basic_auth: Option<BasicAuth>,
    /// Accept any server certificate on `https` addresses.
    pub skip_cert_validation: bool,
}

/// Username and password for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            addresses: vec![DEFAULT_ADDRESS.to_string()],
            request_timeout: None,
            basic_auth: None,
            skip_cert_validation: false,
        }
    }
}

impl OpenSearchConfig {
    /// Create a config pointing at the given addresses.
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Authenticate every request with the given credentials.
    pub fn with_basic_auth(mut self, auth: BasicAuth) -> Self {
        self.basic_auth = Some(auth);
        self
    }

    /// Turn off server certificate validation.
    pub fn with_skip_cert_validation(mut self, skip: bool) -> Self {
        self.skip_cert_validation = skip;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let config = OpenSearchConfig::default().with_basic_auth(BasicAuth::new("admin", "s3cret"));

        let rendered = format!("{:?}", config);

        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
    }
}
