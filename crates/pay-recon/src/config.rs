//! # Reconciliation Timing
//!
//! Active-polling parameters. Every duration is clamped to its documented
//! bound at construction, so the engine never runs with a hostile value.

use std::time::Duration;

/// Hard cap on poll cycles per order; past this the registration is dropped
/// and the order stays queryable but unconfirmed.
pub const MAX_POLL_CYCLES: u32 = 60;

const MIN_WAIT: Duration = Duration::from_secs(5);
const MAX_WAIT: Duration = Duration::from_secs(300);
const MIN_EXPIRATION: Duration = Duration::from_secs(5 * 60);
const MAX_EXPIRATION: Duration = Duration::from_secs(180 * 60);

/// Active-polling configuration
#[derive(Debug, Clone)]
pub struct ReconConfig {
    /// Whether the polling fallback runs at all (deployments that cannot
    /// receive callbacks enable this)
    pub polling_enabled: bool,

    /// Delay before the first poll cycle of a new order
    pub initial_wait: Duration,

    /// Delay between poll cycles
    pub poll_interval: Duration,

    /// Orders older than this are no longer polled
    pub expiration: Duration,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            polling_enabled: false,
            initial_wait: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
            expiration: Duration::from_secs(30 * 60),
        }
    }
}

impl ReconConfig {
    /// Clamp every parameter into its documented bound:
    /// initial wait and interval into [5s, 300s], expiration into
    /// [5min, 180min].
    pub fn sanitized(mut self) -> Self {
        self.initial_wait = self.initial_wait.clamp(MIN_WAIT, MAX_WAIT);
        self.poll_interval = self.poll_interval.clamp(MIN_WAIT, MAX_WAIT);
        self.expiration = self.expiration.clamp(MIN_EXPIRATION, MAX_EXPIRATION);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_bounds() {
        let config = ReconConfig::default();
        let sanitized = config.clone().sanitized();
        assert_eq!(config.initial_wait, sanitized.initial_wait);
        assert_eq!(config.poll_interval, sanitized.poll_interval);
        assert_eq!(config.expiration, sanitized.expiration);
        assert!(!config.polling_enabled);
    }

    #[test]
    fn test_sanitize_clamps_extremes() {
        let config = ReconConfig {
            polling_enabled: true,
            initial_wait: Duration::from_millis(1),
            poll_interval: Duration::from_secs(3600),
            expiration: Duration::from_secs(60),
        }
        .sanitized();

        assert_eq!(config.initial_wait, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.expiration, Duration::from_secs(300));
        assert!(config.polling_enabled);
    }
}
