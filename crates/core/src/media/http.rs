//! reqwest-based fetcher.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, REFERER};
use reqwest::{Client, Response, Url};
use std::time::Duration;
use tracing::debug;

use super::config::MediaConfig;
use super::error::MediaError;
use super::traits::MediaFetcher;
use super::types::AudioProbe;

/// Fetches media over HTTP(S).
pub struct HttpFetcher {
    client: Client,
    image_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher using the timeouts and user agent of `config`.
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.audio_probe_timeout())
            .build()
            .map_err(MediaError::fetch)?;

        Ok(Self {
            client,
            image_timeout: config.image_timeout(),
            probe_timeout: config.audio_probe_timeout(),
        })
    }

    fn map_error(e: reqwest::Error, timeout: Duration) -> MediaError {
        if e.is_timeout() {
            MediaError::Timeout {
                timeout_secs: timeout.as_secs(),
            }
        } else {
            MediaError::fetch(e)
        }
    }

    async fn get(
        &self,
        url: &Url,
        accept: &str,
        timeout: Duration,
    ) -> Result<Response, MediaError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .header(REFERER, url.origin().ascii_serialization())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(e, timeout))?;

        if !response.status().is_success() {
            return Err(MediaError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// Reads the body, refusing anything over `max_bytes`.
    async fn read_limited(
        mut response: Response,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Vec<u8>, MediaError> {
        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(MediaError::TooLarge {
                    size: len,
                    limit: max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_error(e, timeout))?
        {
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(MediaError::TooLarge {
                    size: (body.len() + chunk.len()) as u64,
                    limit: max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_image(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
        let response = self.get(url, "image/*", self.image_timeout).await?;
        let body = Self::read_limited(response, max_bytes, self.image_timeout).await?;
        debug!("Fetched image {} ({} bytes)", url, body.len());
        Ok(body)
    }

    async fn probe_audio(&self, url: &Url) -> Result<AudioProbe, MediaError> {
        let response = self
            .client
            .head(url.clone())
            .header(ACCEPT, "audio/*")
            .header(REFERER, url.origin().ascii_serialization())
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(e, self.probe_timeout))?;

        if !response.status().is_success() {
            return Err(MediaError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(AudioProbe {
            content_length,
            content_type,
        })
    }

    async fn fetch_audio(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
        let response = self.get(url, "audio/*", self.image_timeout).await?;
        Self::read_limited(response, max_bytes, self.image_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&MediaConfig::default()).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_image_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_image(&url(&server, "/a.png"), 1024)
            .await
            .unwrap();
        assert_eq!(body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_image_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_image(&url(&server, "/missing.png"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_image_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_image(&url(&server, "/big.png"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_probe_audio_reads_headers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/memo.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0u8; 4096]),
            )
            .mount(&server)
            .await;

        let probe = fetcher()
            .probe_audio(&url(&server, "/memo.mp3"))
            .await
            .unwrap();
        assert_eq!(probe.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(probe.content_length, Some(4096));
    }
}
