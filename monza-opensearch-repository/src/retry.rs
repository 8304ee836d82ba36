//! Retry policy for bulk requests.
//!
//! Whole requests are retried when the store is unreachable or answers with
//! one of the configured statuses. Individual items rejected inside a
//! successful bulk response are not retried here.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::SearchError;

/// Statuses retried by default.
pub const DEFAULT_RETRY_ON_STATUS: [u16; 4] = [429, 502, 503, 504];

/// Retries attempted by default after the first request.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Step of the default linear backoff.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Delay function applied before retry number `attempt` (1-based).
#[derive(Clone)]
pub struct RetryBackoff(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl RetryBackoff {
    /// Wrap an arbitrary backoff function.
    pub fn new(backoff: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Self(Arc::new(backoff))
    }

    /// `attempt × step`.
    pub fn linear(step: Duration) -> Self {
        Self::new(move |attempt| step.saturating_mul(attempt))
    }

    /// No delay between attempts.
    pub fn none() -> Self {
        Self::new(|_| Duration::ZERO)
    }

    /// Delay before retry number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::linear(DEFAULT_BACKOFF_STEP)
    }
}

impl fmt::Debug for RetryBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetryBackoff")
            .field(&format_args!("[{:?}, {:?}, ..]", self.delay(1), self.delay(2)))
            .finish()
    }
}

/// When and how often a failed bulk request is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Statuses that trigger a retry.
    pub retry_on_status: Vec<u16>,
    /// Delay before each retry.
    pub backoff: RetryBackoff,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_on_status: DEFAULT_RETRY_ON_STATUS.to_vec(),
            backoff: RetryBackoff::default(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Determine if `error` should be retried under this policy.
    pub fn should_retry(&self, error: &SearchError) -> bool {
        error.is_retryable(&self.retry_on_status)
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    ///
    /// The last error is returned when every attempt failed.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, SearchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if !self.should_retry(&e) {
                        debug!(error = %e, "Non-retryable error encountered");
                        return Err(e);
                    }
                    if attempt >= self.max_retries {
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
