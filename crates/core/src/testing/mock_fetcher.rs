//! Mock media fetcher for testing.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::media::{AudioProbe, MediaError, MediaFetcher};

/// Which trait method a request went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Image,
    Probe,
    AudioBody,
}

/// A recorded request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub url: String,
}

#[derive(Debug, Clone)]
struct MockAudio {
    content_type: String,
    size: u64,
}

/// Decrements the in-flight counter when a request settles or is cancelled.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the MediaFetcher trait.
///
/// Provides controllable behavior for testing:
/// - Serve image bodies and audio metadata per URL
/// - Fail selected URLs
/// - Delay every request
/// - Record requests and the peak number of concurrent requests
///
/// Unknown URLs answer with HTTP 404. Clones share state.
///
/// # Example
///
/// ```rust,ignore
/// use diarypress_core::testing::{fixtures, MockFetcher};
///
/// let fetcher = MockFetcher::new();
/// fetcher.add_image("https://img.test/a.png", fixtures::png_bytes(64, 64)).await;
/// fetcher.fail_url("https://img.test/b.png").await;
///
/// // Use with MediaProcessor...
///
/// assert_eq!(fetcher.requests().await.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockFetcher {
    images: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    audio: Arc<RwLock<HashMap<String, MockAudio>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            images: Arc::new(RwLock::new(HashMap::new())),
            audio: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            delay: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve `body` for image requests to `url`.
    pub async fn add_image(&self, url: &str, body: Vec<u8>) {
        self.images.write().await.insert(url.to_string(), body);
    }

    /// Serve audio of the given type and size for `url`.
    pub async fn add_audio(&self, url: &str, content_type: &str, size: u64) {
        self.audio.write().await.insert(
            url.to_string(),
            MockAudio {
                content_type: content_type.to_string(),
                size,
            },
        );
    }

    /// Make every request to `url` fail with HTTP 500.
    pub async fn fail_url(&self, url: &str) {
        self.failing.write().await.insert(url.to_string());
    }

    /// Delay every request by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Get all recorded requests.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Number of body downloads (image or audio) for `url`.
    pub async fn body_downloads(&self, url: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.url == url && r.kind != RequestKind::Probe)
            .count()
    }

    /// Highest number of requests that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, kind: RequestKind, url: &Url) -> Result<InFlight, MediaError> {
        self.requests.write().await.push(RecordedRequest {
            kind,
            url: url.to_string(),
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().await.contains(url.as_str()) {
            return Err(MediaError::Http {
                status: 500,
                url: url.to_string(),
            });
        }
        Ok(guard)
    }

    fn not_found(url: &Url) -> MediaError {
        MediaError::Http {
            status: 404,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_image(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
        let _guard = self.begin(RequestKind::Image, url).await?;
        let body = self
            .images
            .read()
            .await
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(url))?;
        if body.len() as u64 > max_bytes {
            return Err(MediaError::TooLarge {
                size: body.len() as u64,
                limit: max_bytes,
            });
        }
        Ok(body)
    }

    async fn probe_audio(&self, url: &Url) -> Result<AudioProbe, MediaError> {
        let _guard = self.begin(RequestKind::Probe, url).await?;
        let audio = self
            .audio
            .read()
            .await
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(url))?;
        Ok(AudioProbe {
            content_length: Some(audio.size),
            content_type: Some(audio.content_type),
        })
    }

    async fn fetch_audio(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
        let _guard = self.begin(RequestKind::AudioBody, url).await?;
        let audio = self
            .audio
            .read()
            .await
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(url))?;
        if audio.size > max_bytes {
            return Err(MediaError::TooLarge {
                size: audio.size,
                limit: max_bytes,
            });
        }
        Ok(vec![0u8; audio.size as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_serves_configured_media() {
        let fetcher = MockFetcher::new();
        fetcher.add_image("https://m.test/a.png", vec![1, 2, 3]).await;
        fetcher.add_audio("https://m.test/b.mp3", "audio/mpeg", 10).await;

        let body = fetcher
            .fetch_image(&url("https://m.test/a.png"), 100)
            .await
            .unwrap();
        assert_eq!(body, vec![1, 2, 3]);

        let probe = fetcher
            .probe_audio(&url("https://m.test/b.mp3"))
            .await
            .unwrap();
        assert_eq!(probe.content_length, Some(10));
        assert_eq!(probe.content_type.as_deref(), Some("audio/mpeg"));

        assert_eq!(fetcher.requests().await.len(), 2);
        assert_eq!(fetcher.body_downloads("https://m.test/b.mp3").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_urls() {
        let fetcher = MockFetcher::new();
        fetcher.add_image("https://m.test/a.png", vec![0; 8]).await;
        fetcher.fail_url("https://m.test/a.png").await;

        let err = fetcher
            .fetch_image(&url("https://m.test/a.png"), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Http { status: 500, .. }));

        let err = fetcher
            .fetch_image(&url("https://m.test/missing.png"), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Http { status: 404, .. }));
        assert_eq!(fetcher.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let fetcher = MockFetcher::new();
        fetcher.add_audio("https://m.test/b.mp3", "audio/mpeg", 50).await;

        let err = fetcher
            .fetch_audio(&url("https://m.test/b.mp3"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { size: 50, limit: 10 }));
    }
}
