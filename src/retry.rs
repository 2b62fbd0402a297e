//! Reconnect attempt bookkeeping.

use crate::config::ReconnectSettings;
use std::time::Duration;

/// Attempt bounding and delay calculation for the reconnect loop
///
/// Internal type - users configure reconnection via `ReconnectSettings` in
/// `ConnectorConfig`. The contract is a fixed wait between attempts and a
/// hard attempt ceiling; exhausting the ceiling is fatal for the connector.
#[derive(Debug, Clone)]
pub(crate) struct ReconnectStrategy {
    max_attempts: u32,
    interval: Duration,
}

impl ReconnectStrategy {
    /// Create a strategy with a fixed interval between attempts
    pub(crate) fn fixed(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval: Duration::from_millis(interval_ms),
        }
    }

    /// Check whether another attempt is allowed
    ///
    /// # Arguments
    ///
    /// * `attempts_made` - attempts already performed
    pub(crate) fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Wait before the given attempt
    pub(crate) fn delay(&self) -> Duration {
        self.interval
    }

    /// Attempt ceiling
    pub(crate) fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl From<&ReconnectSettings> for ReconnectStrategy {
    fn from(settings: &ReconnectSettings) -> Self {
        Self::fixed(settings.max_attempts, settings.interval_ms)
    }
}
