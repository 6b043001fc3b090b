//! Client-side throttling of requests to the catalog host.

use governor::{DefaultDirectRateLimiter, Quota};
use nonzero_ext::nonzero;

/// Gates every outgoing request behind two quotas: a sustained rate and a
/// minimum spacing between consecutive requests.
pub struct RateLimiter {
    sustained: DefaultDirectRateLimiter,
    spacing: DefaultDirectRateLimiter,
}

impl RateLimiter {
    pub fn new() -> Self {
        // One catalog host serves every request: 4 per second on average,
        // and at most one per 100ms slot.
        let sustained = Quota::per_second(nonzero!(4u32));
        let spacing = Quota::per_second(nonzero!(10u32)).allow_burst(nonzero!(1u32));

        RateLimiter {
            sustained: DefaultDirectRateLimiter::direct(sustained),
            spacing: DefaultDirectRateLimiter::direct(spacing),
        }
    }

    pub async fn wait_until_ready(&self) {
        // The spacing limiter lets exactly one waiter through per slot, so it
        // has to be the last gate.
        self.sustained.until_ready().await;
        self.spacing.until_ready().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_requests_are_spaced() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.wait_until_ready().await;
        limiter.wait_until_ready().await;
        // The second request has to wait for the next 100ms slot.
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_sustained_rate_holds_after_burst() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait_until_ready().await;
        }
        // Spacing alone would let ten requests through in 900ms. After a
        // burst of 4 the sustained quota only frees a slot every 250ms.
        assert!(start.elapsed() >= Duration::from_millis(1200));
    }
}
