//! Reconnect policy for the change listener

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect policy with exponential backoff
///
/// Governs how a listener reacts to transient subscription failures:
/// bounded or unbounded attempts with exponentially growing, capped delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Maximum reconnect attempts before the listener fails (None = unbounded)
    pub max_attempts: Option<u32>,

    /// Delay before the first reconnect attempt
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound on the backoff delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Policy that gives up after `max_attempts` reconnects
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Default::default()
        }
    }

    /// Whether the given 1-based attempt is allowed
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Backoff delay before the given 1-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = Duration::from_millis((self.initial_delay.as_millis() as f64 * exp) as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = ReconnectPolicy {
            max_attempts: None,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(policy.delay(10), Duration::from_secs(1));
    }

    #[test]
    fn test_should_retry_bounds() {
        let unbounded = ReconnectPolicy::default();
        assert!(unbounded.should_retry(1));
        assert!(unbounded.should_retry(1_000_000));

        let bounded = ReconnectPolicy::bounded(2);
        assert!(bounded.should_retry(1));
        assert!(bounded.should_retry(2));
        assert!(!bounded.should_retry(3));

        let none = ReconnectPolicy::bounded(0);
        assert!(!none.should_retry(1));
    }
}
