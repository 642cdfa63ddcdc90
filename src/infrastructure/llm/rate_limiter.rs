use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::domain::models::RateLimitConfig;

/// Token bucket rate limiter shared by all model profiles
///
/// Cloning shares the bucket.
#[derive(Clone)]
pub struct UpstreamRateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl UpstreamRateLimiter {
    /// Create a limiter allowing `requests_per_second` with bursts of `burst_size`.
    ///
    /// Zero values are treated as one.
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token without waiting; false when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl From<&RateLimitConfig> for UpstreamRateLimiter {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_enforced() {
        let limiter = UpstreamRateLimiter::new(1, 2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_clones_share_bucket() {
        let limiter = UpstreamRateLimiter::new(1, 1);
        let clone = limiter.clone();
        assert!(limiter.try_acquire());
        assert!(!clone.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_within_burst_does_not_block() {
        let limiter = UpstreamRateLimiter::new(10, 5);
        for _ in 0..5 {
            limiter.acquire().await;
        }
    }
}
