//! Retry policy
//!
//! Decides whether an HTTP outcome deserves another attempt and how long to
//! wait before it. The wait uses exponential growth with full jitter: the first
//! retry waits exactly `wait_min`, later retries draw uniformly from
//! `[0, min(wait_min * 2^attempt, wait_max))`.

use rand::Rng;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_WAIT_MIN: Duration = Duration::from_millis(200);
pub const DEFAULT_WAIT_MAX: Duration = Duration::from_secs(1);

/// Status codes retried unless configured otherwise.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the attempt budget is `1 + max_retries`.
    pub max_retries: u32,
    /// Wait before the first retry, and the base of the exponential growth.
    pub wait_min: Duration,
    /// Upper bound of any wait.
    pub wait_max: Duration,
    /// Responses with these statuses are retried while attempts remain.
    pub retry_status_codes: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            wait_min: DEFAULT_WAIT_MIN,
            wait_max: DEFAULT_WAIT_MAX,
            retry_status_codes: DEFAULT_RETRY_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set both wait bounds. Zero falls back to the default and reversed
    /// bounds are swapped.
    pub fn with_wait(mut self, wait_min: Duration, wait_max: Duration) -> Self {
        self.wait_min = wait_min;
        self.wait_max = wait_max;
        self.normalized()
    }

    /// Replace the retried status set. An empty list keeps the current set.
    pub fn with_retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        let codes: BTreeSet<u16> = codes.into_iter().collect();
        if !codes.is_empty() {
            self.retry_status_codes = codes;
        }
        self
    }

    /// Fix zero or reversed wait bounds.
    pub fn normalized(mut self) -> Self {
        if self.wait_min.is_zero() {
            self.wait_min = DEFAULT_WAIT_MIN;
        }
        if self.wait_max.is_zero() {
            self.wait_max = DEFAULT_WAIT_MAX;
        }
        if self.wait_min > self.wait_max {
            std::mem::swap(&mut self.wait_min, &mut self.wait_max);
        }
        self
    }

    /// Total attempts allowed, first one included.
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Transport failures are retried on timeouts and truncated bodies only.
    pub fn should_retry_error(&self, error: &ClientError) -> bool {
        error.is_retryable()
    }

    /// Wait before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.wait_min;
        }

        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let cap = self.wait_min.saturating_mul(factor).min(self.wait_max);
        if cap.is_zero() {
            return cap;
        }

        let nanos = u64::try_from(cap.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.attempt_budget(), 4);
        assert_eq!(policy.wait_min, Duration::from_millis(200));
        assert_eq!(policy.wait_max, Duration::from_secs(1));
        for code in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry_status(code));
        }
        assert!(!policy.should_retry_status(400));
        assert!(!policy.should_retry_status(501));
    }

    #[test]
    fn first_backoff_is_exactly_wait_min() {
        let policy = RetryPolicy::default();
        for _ in 0..20 {
            assert_eq!(policy.backoff(0), Duration::from_millis(200));
        }
    }

    #[test]
    fn later_backoffs_stay_below_cap() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            assert!(policy.backoff(1) < Duration::from_millis(400));
            assert!(policy.backoff(2) < Duration::from_millis(800));
            assert!(policy.backoff(3) < Duration::from_secs(1));
            assert!(policy.backoff(40) < Duration::from_secs(1));
        }
    }

    #[test]
    fn wait_bounds_are_normalized() {
        let policy = RetryPolicy::new().with_wait(Duration::from_secs(2), Duration::from_millis(100));
        assert_eq!(policy.wait_min, Duration::from_millis(100));
        assert_eq!(policy.wait_max, Duration::from_secs(2));

        let policy = RetryPolicy::new().with_wait(Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.wait_min, DEFAULT_WAIT_MIN);
        assert_eq!(policy.wait_max, DEFAULT_WAIT_MAX);
    }

    #[test]
    fn status_codes_replace_only_when_non_empty() {
        let policy = RetryPolicy::new().with_retry_status_codes([]);
        assert!(policy.should_retry_status(503));

        let policy = RetryPolicy::new().with_retry_status_codes([418]);
        assert!(policy.should_retry_status(418));
        assert!(!policy.should_retry_status(503));
    }

    #[test]
    fn transport_retry_classification() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.attempt_budget(), 1);
        assert!(policy.should_retry_error(&ClientError::Timeout("t".into())));
        assert!(!policy.should_retry_error(&ClientError::Cancelled));
    }
}
