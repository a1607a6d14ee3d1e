//! Bounded exponential backoff with jitter.

use crate::context::Context;
use crate::error::CoreResult;
use std::time::Duration;

/// Retry settings for one window update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Lower bound on any single delay, and the delay before the first retry.
    pub min_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(10),
            max_retries: 10,
        }
    }
}

impl BackoffConfig {
    /// Sets the minimum delay.
    #[must_use]
    pub fn with_min_backoff(mut self, delay: Duration) -> Self {
        self.min_backoff = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Sets the retry limit.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Configuration that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            min_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            max_retries: 0,
        }
    }
}

/// Backoff state for a single window.
///
/// The n-th delay is `min_backoff * 2^n` capped at `max_backoff`, then
/// jittered uniformly into its upper half so concurrent writers spread out.
/// Jitter never takes a delay below `min_backoff`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    retries: u32,
}

impl Backoff {
    /// Creates backoff state with no retries used.
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, retries: 0 }
    }

    /// Forgets previous retries.
    pub fn reset(&mut self) {
        self.retries = 0;
    }

    /// Retries used so far.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Returns true while another retry is allowed.
    #[must_use]
    pub fn ongoing(&self) -> bool {
        self.retries < self.config.max_retries
    }

    /// Computes the next delay and counts a retry.
    pub fn next_delay(&mut self) -> Duration {
        let min = self.config.min_backoff.as_millis() as u64;
        let max = self.config.max_backoff.as_millis() as u64;
        let exp = min.saturating_mul(1u64.checked_shl(self.retries).unwrap_or(u64::MAX));
        let capped = exp.min(max);
        let floor = (capped - capped / 2).max(min).min(capped);
        let jitter = rand::random::<u64>() % (capped - floor + 1);
        self.retries = self.retries.saturating_add(1);
        Duration::from_millis(floor + jitter)
    }

    /// Sleeps for the next delay, waking early on cancellation.
    ///
    /// # Errors
    ///
    /// Returns the context error if cancelled or past its deadline.
    pub fn wait(&mut self, ctx: &Context) -> CoreResult<()> {
        let delay = self.next_delay();
        ctx.wait(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn config(min_ms: u64, max_ms: u64, retries: u32) -> BackoffConfig {
        BackoffConfig::default()
            .with_min_backoff(Duration::from_millis(min_ms))
            .with_max_backoff(Duration::from_millis(max_ms))
            .with_max_retries(retries)
    }

    #[test]
    fn defaults() {
        let config = BackoffConfig::default();
        assert_eq!(config.min_backoff, Duration::from_millis(50));
        assert_eq!(config.max_backoff, Duration::from_secs(10));
        assert_eq!(config.max_retries, 10);
    }

    #[test]
    fn delays_grow_and_stay_within_bounds() {
        let mut backoff = Backoff::new(config(100, 10_000, 10));

        let d1 = backoff.next_delay();
        let d2 = backoff.next_delay();
        let d3 = backoff.next_delay();

        assert_eq!(d1, Duration::from_millis(100));
        assert!((100..=200).contains(&d2.as_millis()));
        assert!((200..=400).contains(&d3.as_millis()));
    }

    #[test]
    fn jitter_never_undercuts_min_backoff() {
        for _ in 0..50 {
            let mut backoff = Backoff::new(config(50, 10_000, 10));
            for _ in 0..10 {
                assert!(backoff.next_delay() >= Duration::from_millis(50));
            }
        }
    }

    #[test]
    fn delays_cap_at_max() {
        let mut backoff = Backoff::new(config(100, 500, 100));
        for _ in 0..80 {
            assert!(backoff.next_delay() <= Duration::from_millis(500));
        }
    }

    #[test]
    fn retries_are_bounded() {
        let mut backoff = Backoff::new(config(0, 0, 3));
        let mut waits = 0;
        while backoff.ongoing() {
            backoff.next_delay();
            waits += 1;
        }
        assert_eq!(waits, 3);

        backoff.reset();
        assert!(backoff.ongoing());
        assert_eq!(backoff.retries(), 0);
    }

    #[test]
    fn no_retry_is_never_ongoing() {
        assert!(!Backoff::new(BackoffConfig::no_retry()).ongoing());
    }

    #[test]
    fn wait_returns_cancellation() {
        let ctx = Context::new();
        ctx.cancel();
        let mut backoff = Backoff::new(config(10_000, 10_000, 3));
        assert!(matches!(backoff.wait(&ctx), Err(CoreError::Cancelled)));
    }
}
