use std::time::{Duration, Instant};

use diarypress_core::{CleanupManager, Config, GenerationPipeline, ProgressChannel};

/// Shared application state
pub struct AppState {
    config: Config,
    pipeline: GenerationPipeline,
    cleanup: CleanupManager,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, pipeline: GenerationPipeline, cleanup: CleanupManager) -> Self {
        Self {
            config,
            pipeline,
            cleanup,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    pub fn progress(&self) -> &ProgressChannel {
        self.pipeline.channel()
    }

    pub fn cleanup(&self) -> &CleanupManager {
        &self.cleanup
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
