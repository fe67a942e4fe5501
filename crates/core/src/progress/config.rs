//! Progress channel configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the progress channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// How long the latest event of a job stays cached (seconds).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Delay between a terminal event and observer teardown (milliseconds).
    /// Gives transports time to flush the final frame.
    #[serde(default = "default_teardown_delay")]
    pub teardown_delay_ms: u64,

    /// Threshold above which an estimated remaining time is attached (percent).
    #[serde(default = "default_estimate_after")]
    pub estimate_after_percent: f64,
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_teardown_delay() -> u64 {
    1000
}

fn default_estimate_after() -> f64 {
    30.0
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            teardown_delay_ms: default_teardown_delay(),
            estimate_after_percent: default_estimate_after(),
        }
    }
}

impl ProgressConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }

    /// Sets the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Sets the teardown delay.
    pub fn with_teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay_ms = delay.as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProgressConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.teardown_delay(), Duration::from_millis(1000));
        assert_eq!(config.estimate_after_percent, 30.0);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ProgressConfig = toml::from_str("cache_ttl_secs = 60").unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.teardown_delay_ms, 1000);
    }
}
