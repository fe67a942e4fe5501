//! Error types for the generation pipeline.

use std::path::PathBuf;
use thiserror::Error;

use super::options::OutputFormat;
use crate::journal::ValidationError;

/// Errors raised while turning a document into an artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Renderer program not found.
    #[error("Renderer not found at path: {path}")]
    RendererNotFound { path: PathBuf },

    /// Renderer exited unsuccessfully.
    #[error("Rendering failed: {reason}")]
    RenderFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Renderer did not finish in time.
    #[error("Rendering timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Document assembly failed.
    #[error("Failed to assemble document: {0}")]
    Assembly(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn render_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::RenderFailed {
            reason: reason.into(),
            stderr,
        }
    }
}

/// Errors surfaced by the generation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Job already running: {0}")]
    JobExists(String),

    #[error("No renderer available for format: {0}")]
    UnsupportedFormat(OutputFormat),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the failure was caused by the submitted input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InvalidJobId(_)
                | Self::JobExists(_)
                | Self::UnsupportedFormat(_)
        )
    }
}
