//! Cleanup configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Age-based reclamation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Directory roots to scan. Empty means the storage output and temp
    /// directories.
    #[serde(default)]
    pub targets: Vec<PathBuf>,

    /// Entries at least this old are removed.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Time between scheduled scans.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Whether scheduled scans run at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_age_secs() -> u64 {
    30 * 60
}

fn default_interval_secs() -> u64 {
    5 * 60
}

fn default_enabled() -> bool {
    true
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            max_age_secs: default_max_age_secs(),
            interval_secs: default_interval_secs(),
            enabled: default_enabled(),
        }
    }
}

impl CleanupConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = PathBuf>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }
}

/// Partial update applied with [`CleanupManager::update_config`](super::CleanupManager::update_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CleanupConfigUpdate {
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl CleanupConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.max_age_secs.is_none() && self.interval_secs.is_none() && self.enabled.is_none()
    }

    /// Returns `config` with the present fields replaced.
    pub fn apply(&self, config: &CleanupConfig) -> CleanupConfig {
        CleanupConfig {
            targets: config.targets.clone(),
            max_age_secs: self.max_age_secs.unwrap_or(config.max_age_secs),
            interval_secs: self.interval_secs.unwrap_or(config.interval_secs),
            enabled: self.enabled.unwrap_or(config.enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CleanupConfig::default();
        assert_eq!(config.max_age(), Duration::from_secs(1800));
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert!(config.enabled);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_apply_partial_update() {
        let config = CleanupConfig::default().with_targets([PathBuf::from("/tmp/out")]);
        let update: CleanupConfigUpdate =
            serde_json::from_str(r#"{"max_age_secs": 60}"#).unwrap();

        let merged = update.apply(&config);
        assert_eq!(merged.max_age_secs, 60);
        assert_eq!(merged.interval_secs, 300);
        assert!(merged.enabled);
        assert_eq!(merged.targets, vec![PathBuf::from("/tmp/out")]);
        assert!(!update.is_empty());
        assert!(CleanupConfigUpdate::default().is_empty());
    }
}
