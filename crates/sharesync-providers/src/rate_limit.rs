//! Per-client call pacing.
//!
//! Every provider client owns one [`CallLimiter`], acquired before each HTTP
//! call, so a single account can't hammer a provider faster than the
//! configured per-drive rate even when several sync runs touch it at once.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};

type GovernorLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Wraps a `governor` token-bucket limiter behind a cheap-to-clone handle.
#[derive(Clone)]
pub struct CallLimiter {
    inner: Arc<GovernorLimiter>,
}

impl CallLimiter {
    /// `calls_per_second` must be >= 1; values `< 1` are rounded up to 1.
    pub fn per_second(calls_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(calls_per_second.max(1)).unwrap());
        Self {
            inner: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Suspends the caller until a call slot is available.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn first_call_does_not_wait() {
        let limiter = CallLimiter::per_second(5);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed().as_millis() < 50);
    }

    #[tokio::test]
    async fn exhausting_the_bucket_forces_a_wait() {
        let limiter = CallLimiter::per_second(2);
        limiter.acquire().await;
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed().as_millis() >= 100);
    }
}
