//! Client-side call rate limiting
//!
//! A token bucket shared by every request of a client. Each call takes one
//! token; a background task puts `rate` tokens back every `period`, never
//! exceeding `capacity`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// Shortest refill period; `tokio::time::interval` rejects a zero one.
const MIN_REFILL_PERIOD: Duration = Duration::from_millis(1);

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a call may proceed.
    async fn wait(&self) -> Result<(), ClientError>;

    /// Stop refilling. Every later `wait` fails.
    fn stop(&self);
}

/// Token bucket limiter.
#[derive(Debug)]
pub struct BucketRateLimiter {
    tokens: Arc<Semaphore>,
    capacity: usize,
    stop: CancellationToken,
}

impl BucketRateLimiter {
    /// Start with a full bucket. Must be called within a tokio runtime.
    ///
    /// A `period` below one millisecond is raised to one millisecond.
    pub fn new(rate: usize, capacity: usize, period: Duration) -> Self {
        let period = period.max(MIN_REFILL_PERIOD);
        let tokens = Arc::new(Semaphore::new(capacity));
        let stop = CancellationToken::new();

        tokio::spawn(refill(tokens.clone(), rate, capacity, period, stop.clone()));

        Self {
            tokens,
            capacity,
            stop,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently in the bucket.
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }
}

async fn refill(
    tokens: Arc<Semaphore>,
    rate: usize,
    capacity: usize,
    period: Duration,
    stop: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; the bucket starts full anyway.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {
                let missing = capacity.saturating_sub(tokens.available_permits());
                let add = rate.min(missing);
                if add > 0 {
                    tokens.add_permits(add);
                }
            }
        }
    }
}

#[async_trait]
impl RateLimiter for BucketRateLimiter {
    async fn wait(&self) -> Result<(), ClientError> {
        let permit = self
            .tokens
            .acquire()
            .await
            .map_err(|_| ClientError::Configuration("rate limiter stopped".to_string()))?;
        permit.forget();
        Ok(())
    }

    fn stop(&self) {
        self.tokens.close();
        self.stop.cancel();
    }
}

impl Drop for BucketRateLimiter {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Limiter that never blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneRateLimiter;

#[async_trait]
impl RateLimiter for NoneRateLimiter {
    async fn wait(&self) -> Result<(), ClientError> {
        Ok(())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bucket_blocks_when_empty_and_refills() {
        let limiter = BucketRateLimiter::new(1, 2, Duration::from_millis(100));

        limiter.wait().await.unwrap();
        limiter.wait().await.unwrap();
        assert_eq!(limiter.available(), 0);

        let blocked = tokio::time::timeout(Duration::from_millis(50), limiter.wait()).await;
        assert!(blocked.is_err(), "third call must wait for a refill");

        tokio::time::timeout(Duration::from_millis(200), limiter.wait())
            .await
            .expect("refilled within one period")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn refill_never_exceeds_capacity() {
        let limiter = BucketRateLimiter::new(5, 3, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.available(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_still_refills() {
        let limiter = BucketRateLimiter::new(1, 1, Duration::ZERO);

        limiter.wait().await.unwrap();
        tokio::time::timeout(Duration::from_millis(50), limiter.wait())
            .await
            .expect("refilled after the minimum period")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_bucket_rejects_waits() {
        let limiter = BucketRateLimiter::new(1, 1, Duration::from_millis(10));
        limiter.stop();
        assert!(limiter.wait().await.is_err());
    }

    #[tokio::test]
    async fn none_limiter_never_blocks() {
        let limiter = NoneRateLimiter;
        for _ in 0..100 {
            limiter.wait().await.unwrap();
        }
    }
}
