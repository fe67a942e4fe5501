//! Media configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for media resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// References resolved concurrently per job.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Network operations in flight across all jobs.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Image download timeout (seconds).
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,

    /// Largest image body accepted (bytes).
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Bounding box for transcoded images. Smaller images are not enlarged.
    #[serde(default = "default_image_max_width")]
    pub image_max_width: u32,

    #[serde(default = "default_image_max_height")]
    pub image_max_height: u32,

    /// JPEG quality (1-100).
    #[serde(default = "default_image_quality")]
    pub image_quality: u8,

    /// Audio metadata probe timeout (seconds).
    #[serde(default = "default_audio_probe_timeout")]
    pub audio_probe_timeout_secs: u64,

    /// Audio larger than this is never downloaded (bytes).
    #[serde(default = "default_audio_size_ceiling")]
    pub audio_size_ceiling_bytes: u64,

    /// Stage audio bodies under the ceiling next to the job's other files.
    #[serde(default)]
    pub embed_audio: bool,

    /// Leave every locator untouched and skip all network access.
    #[serde(default)]
    pub skip_download: bool,

    /// URL schemes media may be fetched from.
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_batch_size() -> usize {
    5
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_image_timeout() -> u64 {
    15
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_image_max_width() -> u32 {
    800
}

fn default_image_max_height() -> u32 {
    600
}

fn default_image_quality() -> u8 {
    85
}

fn default_audio_probe_timeout() -> u64 {
    10
}

fn default_audio_size_ceiling() -> u64 {
    20 * 1024 * 1024
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_user_agent() -> String {
    format!("diarypress/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            image_timeout_secs: default_image_timeout(),
            max_image_bytes: default_max_image_bytes(),
            image_max_width: default_image_max_width(),
            image_max_height: default_image_max_height(),
            image_quality: default_image_quality(),
            audio_probe_timeout_secs: default_audio_probe_timeout(),
            audio_size_ceiling_bytes: default_audio_size_ceiling(),
            embed_audio: false,
            skip_download: false,
            allowed_schemes: default_allowed_schemes(),
            user_agent: default_user_agent(),
        }
    }
}

impl MediaConfig {
    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn audio_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.audio_probe_timeout_secs)
    }

    /// Whether media may be fetched over `scheme`.
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MediaConfig::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.image_timeout(), Duration::from_secs(15));
        assert_eq!(config.audio_probe_timeout(), Duration::from_secs(10));
        assert!(config.audio_probe_timeout() < config.image_timeout());
        assert_eq!(config.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!((config.image_max_width, config.image_max_height), (800, 600));
        assert_eq!(config.image_quality, 85);
        assert!(!config.embed_audio);
        assert!(!config.skip_download);
    }

    #[test]
    fn test_allows_scheme() {
        let config = MediaConfig::default();
        assert!(config.allows_scheme("https"));
        assert!(config.allows_scheme("HTTP"));
        assert!(!config.allows_scheme("file"));
        assert!(!config.allows_scheme("ftp"));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            batch_size = 10
            skip_download = true
        "#;
        let config: MediaConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.batch_size, 10);
        assert!(config.skip_download);
        assert_eq!(config.image_quality, 85);
    }
}
