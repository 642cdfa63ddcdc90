use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::{PipelineError, UpstreamError};
use crate::domain::models::RetryConfig;

/// Retry policy for transient upstream failures
///
/// Backoff doubles with each retry starting from `initial_backoff_ms`,
/// clamped to `[min_backoff_ms, max_backoff_ms]`.
///
/// # Retry Decision
/// - Retry on: 429, 5xx, network errors, timeouts
/// - Do NOT retry: 400, 401, 403, 404, decode failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    max_attempts: u32,
    initial_backoff_ms: u64,
    min_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// Zero attempts is raised to one; bounds are reordered if inverted.
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, min_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            min_backoff_ms: min_backoff_ms.min(max_backoff_ms),
            max_backoff_ms: max_backoff_ms.max(min_backoff_ms),
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation, retrying transient failures.
    ///
    /// # Returns
    /// * `Ok(T)` - an attempt succeeded
    /// * `Err(PipelineError::UpstreamTransientFailure)` - every attempt failed transiently
    /// * `Err(PipelineError::Upstream)` - a permanent failure, not retried
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(operation = operation_name, "Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) if !err.is_transient() => {
                    debug!(operation = operation_name, "Permanent error, not retrying: {}", err);
                    return Err(PipelineError::Upstream(err));
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        warn!(operation = operation_name, "Operation failed after {} attempts: {}", attempt, err);
                        return Err(PipelineError::UpstreamTransientFailure {
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let backoff = self.calculate_backoff(attempt - 1);
                    warn!(
                        operation = operation_name,
                        "Attempt {} failed with transient error: {}. Retrying in {:?}...",
                        attempt,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                }
            }
        }
    }

    /// Calculate backoff duration for a given retry (0-indexed)
    ///
    /// Formula: clamp(initial_backoff * 2^retry, min_backoff, max_backoff)
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(retry))
            .clamp(self.min_backoff_ms, self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    /// Every delay the policy can sleep, in order.
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.calculate_backoff(retry))
            .collect()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff_ms,
            config.min_backoff_ms,
            config.max_backoff_ms,
        )
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 1s doubling, bounded to 0.5s..10s.
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
