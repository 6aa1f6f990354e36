//! Token bucket rate limiting for outbound provider requests

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Shortest wait between refill checks.
const MIN_WAIT: Duration = Duration::from_millis(50);
/// Longest single sleep; the refill is re-checked after it.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Bounds the sustained request rate of one provider while allowing bursts.
///
/// `acquire` never rejects; it only delays the caller until a token is free.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket refilling at `rate` tokens per second, holding at most
    /// `burst` tokens (at least one). A non-positive rate never waits.
    pub fn new(rate: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// A bucket that never delays.
    pub fn unlimited() -> Self {
        Self::new(0.0, 1)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Wait for one token and consume it.
    pub async fn acquire(&self) {
        if self.rate <= 0.0 || !self.rate.is_finite() {
            return;
        }

        loop {
            let wait = match self.try_take() {
                Ok(()) => return,
                Err(wait) => wait,
            };
            tracing::trace!(wait_ms = %wait.as_millis(), "Rate limiter waiting for token");
            sleep(wait).await;
        }
    }

    /// Take a token if one is available, otherwise report how long until one is.
    fn try_take(&self) -> Result<(), Duration> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let missing = (1.0 - state.tokens) / self.rate;
            let wait = Duration::try_from_secs_f64(missing).unwrap_or(MAX_WAIT);
            Err(wait.clamp(MIN_WAIT, MAX_WAIT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_third_acquire_waits() {
        let bucket = TokenBucket::new(2.0, 1);
        let start = Instant::now();

        bucket.acquire().await;
        bucket.acquire().await;
        let before_third = Instant::now();
        bucket.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(400));
        assert!(before_third.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_immediate() {
        let bucket = TokenBucket::new(1.0, 3);
        let start = Instant::now();

        for _ in 0..3 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));

        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_are_bounded() {
        let crawl = TokenBucket::new(1e-300, 1);
        assert!(crawl.try_take().is_ok());
        assert_eq!(crawl.try_take(), Err(MAX_WAIT));

        let quick = TokenBucket::new(1000.0, 1);
        assert!(quick.try_take().is_ok());
        assert_eq!(quick.try_take(), Err(MIN_WAIT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buckets_are_independent() {
        let slow = TokenBucket::new(0.5, 1);
        let fast = TokenBucket::new(100.0, 1);

        slow.acquire().await;
        let start = Instant::now();
        fast.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_zero_rate_never_blocks() {
        let bucket = TokenBucket::new(0.0, 1);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(TokenBucket::unlimited().rate(), 0.0);
    }

    #[test]
    fn test_capacity_floor() {
        assert_eq!(TokenBucket::new(1.0, 0).capacity(), 1.0);
    }
}
