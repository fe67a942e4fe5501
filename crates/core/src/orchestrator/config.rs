//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for job trackers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How often the progress estimate is recomputed (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Minimum wall-clock duration of a small job before its terminal
    /// event may fire (milliseconds).
    #[serde(default = "default_min_duration")]
    pub min_duration_ms: u64,

    /// Jobs with fewer entries than this are small.
    #[serde(default = "default_small_job_threshold")]
    pub small_job_threshold: usize,

    /// Jobs with more entries than this get a processed-items annotation.
    #[serde(default = "default_large_job_threshold")]
    pub large_job_threshold: usize,

    /// Time in a stage after which a flat estimate is replaced by a slow
    /// trickle (milliseconds).
    #[serde(default = "default_stall_window")]
    pub stall_window_ms: u64,
}

fn default_tick_interval() -> u64 {
    500
}

fn default_min_duration() -> u64 {
    1500
}

fn default_small_job_threshold() -> usize {
    100
}

fn default_large_job_threshold() -> usize {
    5000
}

fn default_stall_window() -> u64 {
    2000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            min_duration_ms: default_min_duration(),
            small_job_threshold: default_small_job_threshold(),
            large_job_threshold: default_large_job_threshold(),
            stall_window_ms: default_stall_window(),
        }
    }
}

impl OrchestratorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }

    pub fn stall_window(&self) -> Duration {
        Duration::from_millis(self.stall_window_ms)
    }

    /// Whether a job of `total_entries` gets the minimum-duration floor.
    pub fn is_small_job(&self, total_entries: usize) -> bool {
        total_entries < self.small_job_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.min_duration(), Duration::from_millis(1500));
        assert_eq!(config.small_job_threshold, 100);
        assert_eq!(config.large_job_threshold, 5000);
        assert_eq!(config.stall_window_ms, 2000);
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            tick_interval_ms = 250
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.min_duration_ms, 1500);
    }

    #[test]
    fn test_is_small_job() {
        let config = OrchestratorConfig::default();
        assert!(config.is_small_job(0));
        assert!(config.is_small_job(99));
        assert!(!config.is_small_job(100));
    }
}
