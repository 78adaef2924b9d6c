use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::domain::models::RateLimitConfig;

/// Token bucket rate limiter for API request throttling
///
/// Tokens refill continuously at `refill_rate` per second up to `capacity`.
/// Each request consumes one token.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    state: Arc<Mutex<BucketState>>,
    capacity: f64,
    refill_rate: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketRateLimiter {
    /// Create a limiter with `requests_per_second` refill and `burst` capacity.
    ///
    /// Non-positive values are clamped to a tiny positive rate and a burst of one.
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let refill_rate = if requests_per_second > 0.0 { requests_per_second } else { 0.001 };
        let capacity = f64::from(burst.max(1));
        Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            })),
            capacity,
            refill_rate,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }

    /// Acquire a token from the bucket, waiting if necessary
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = elapsed.mul_add(self.refill_rate, state.tokens).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
            };
            sleep(wait).await;
        }
    }

    /// Tokens currently available (after refill).
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = elapsed.mul_add(self.refill_rate, state.tokens).min(self.capacity);
        state.last_refill = now;
        state.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_is_available_immediately() {
        let limiter = TokenBucketRateLimiter::new(1.0, 3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(limiter.available().await < 1.0);
    }

    #[tokio::test]
    async fn test_waits_for_refill() {
        let limiter = TokenBucketRateLimiter::new(50.0, 1);
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
