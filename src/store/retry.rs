//! Exponential backoff with jitter for contended writes

use rand::Rng;
use std::time::Duration;

use crate::config::StoreConfig;

/// Backoff schedule for the retrying update path
///
/// The ceiling for retry `attempt` (0-based) is `base_delay * 2^attempt`; the actual
/// delay is drawn uniformly from `[0.5, 1.0]` of that ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay)
    }

    /// Upper bound of the delay before retry `attempt`
    pub fn ceiling(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Randomized delay before retry `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        self.ceiling(attempt).mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}
