use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cleanup::CleanupConfig;
use crate::media::MediaConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::pipeline::RendererConfig;
use crate::progress::ProgressConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

impl Config {
    /// Cleanup configuration with targets resolved.
    ///
    /// When no explicit targets are configured, the output and temp
    /// directories are reclaimed.
    pub fn resolved_cleanup(&self) -> CleanupConfig {
        let mut cleanup = self.cleanup.clone();
        if cleanup.targets.is_empty() {
            cleanup.targets = vec![
                self.storage.output_dir.clone(),
                self.storage.temp_dir.clone(),
            ];
        }
        cleanup
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

/// Working directories
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Finished artifacts, served under `/downloads`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// In-flight documents and staged media.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}
