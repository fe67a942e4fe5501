//! Error types for the media module.

use thiserror::Error;

/// Errors resolving a single media reference.
///
/// These never fail a job; the reference falls back to its original locator.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The locator could not be parsed.
    #[error("Invalid media URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The locator uses a scheme media may not be fetched from.
    #[error("Unsupported URL scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The remote answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The body exceeds the configured limit.
    #[error("Media too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// The operation did not finish in time.
    #[error("Media request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Transport failure.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The body could not be decoded or re-encoded.
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// I/O error while staging media.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(reason: impl ToString) -> Self {
        Self::Fetch(reason.to_string())
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } | Self::UnsupportedScheme { .. } => "rejected",
            Self::Http { .. } | Self::Fetch(_) | Self::Io(_) => "fetch_error",
            Self::TooLarge { .. } => "too_large",
            Self::Timeout { .. } => "timeout",
            Self::Transcode(_) => "transcode_error",
        }
    }
}

impl From<image::ImageError> for MediaError {
    fn from(e: image::ImageError) -> Self {
        Self::Transcode(e.to_string())
    }
}
