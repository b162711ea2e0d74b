//! Bounded retry with exponential (or fixed) backoff.

use std::time::Duration;

use gauge_core::config::ResilienceConfig;

/// Attempt budget and backoff schedule for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// - `max_attempts`: total attempts including the first (at least 1)
    /// - `multiplier`: growth per retry; 1.0 gives a fixed backoff
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        multiplier: f64,
        max_backoff: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            multiplier: multiplier.max(1.0),
            max_backoff,
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, delay, 1.0, delay)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl From<&ResilienceConfig> for RetryPolicy {
    fn from(config: &ResilienceConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
            config.backoff_multiplier,
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}
