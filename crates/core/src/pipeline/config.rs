//! Renderer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// External renderer settings.
///
/// When `command` is unset only HTML output is available.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RendererConfig {
    /// Program producing paginated output, e.g. a headless browser.
    #[serde(default)]
    pub command: Option<PathBuf>,

    /// Arguments passed to `command`. `{input}`, `{output}` and
    /// `{page_size}` are substituted per job.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Maximum time a single render may take.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_args() -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--disable-gpu".to_string(),
        "--no-pdf-header-footer".to_string(),
        "--print-to-pdf={output}".to_string(),
        "{input}".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: default_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert!(config.command.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(config.args.iter().any(|a| a.contains("{output}")));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RendererConfig = toml::from_str(
            r#"
command = "/usr/bin/chromium"
timeout_secs = 30
"#,
        )
        .unwrap();
        assert_eq!(config.command, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.args, default_args());
    }
}
