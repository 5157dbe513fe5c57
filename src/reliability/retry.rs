//! Retry with exponential backoff for deploy API calls.
//!
//! Deploy steps are idempotent (re-uploading makes a fresh blob, re-running
//! an upsert or finalize converges), so transient failures are retried
//! rather than aborting a half-finished deployment.
//!
//! # Example
//!
//! ```rust,ignore
//! use siteship::reliability::retry::{retry_async, RetryConfig};
//!
//! let body = retry_async(
//!     RetryConfig::network(),
//!     "finalize",
//!     || async { client.finalize(&deployment).await },
//!     |e| e.is_transient(),
//! ).await?;
//! ```

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule for one call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Delay multiplier between retries.
    pub factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::network()
    }
}

impl RetryConfig {
    /// Schedule for calls to the deploy API or an edge provider.
    #[must_use]
    pub fn network() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
        }
    }

    /// Single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::network()
        }
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay.max(self.initial_delay))
            .with_max_times(self.max_retries as usize)
            .with_factor(self.factor)
            .with_jitter()
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or the retry budget runs out. Returns the last error in the latter cases.
pub async fn retry_async<F, Fut, T, E, R>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let max_retries = config.max_retries;
    let mut attempt = 0u32;
    let notify = |err: &E, delay: Duration| {
        attempt += 1;
        warn!(
            operation = %operation_name,
            attempt,
            max_retries,
            next_delay_ms = delay.as_millis() as u64,
            error = %err,
            "Request failed, retrying"
        );
    };

    operation
        .retry(config.backoff())
        .when(is_retryable)
        .notify(notify)
        .await
}

/// HTTP statuses worth retrying: timeouts, throttling and gateway errors.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}
