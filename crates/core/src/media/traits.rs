//! Trait definitions for the media module.

use async_trait::async_trait;
use reqwest::Url;

use super::error::MediaError;
use super::types::AudioProbe;

/// Retrieves remote media.
///
/// Implementations enforce their own size limits; the processor applies
/// timeouts around every call.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads an image body of at most `max_bytes`.
    async fn fetch_image(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, MediaError>;

    /// Reads audio metadata without downloading the body.
    async fn probe_audio(&self, url: &Url) -> Result<AudioProbe, MediaError>;

    /// Downloads an audio body of at most `max_bytes`.
    async fn fetch_audio(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, MediaError>;
}
