//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock media fetcher, so whole jobs run without network access.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use diarypress_core::{
    testing::{MockFetcher, MockRenderer},
    BasicHtmlAssembler, CleanupConfig, CleanupManager, Config, GenerationPipeline, MediaProcessor,
    OrchestratorConfig, OutputFormat, ProgressChannel, StorageConfig,
};
use diarypress_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use diarypress_core::testing::fixtures;

/// Test fixture with an in-process router.
///
/// The pipeline uses the real HTML assembler and renderer, a mock fetcher
/// for media, and a temp directory for output and scratch files.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.post("/api/v1/jobs", json!({ "entries": [...] })).await;
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock media fetcher - configure image and audio responses
    pub fetcher: MockFetcher,
    /// Cleanup manager shared with the router
    pub cleanup: CleanupManager,
    /// Artifact directory served under /downloads
    pub output_dir: PathBuf,
    /// Temporary directory holding output and scratch files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Raw response for non-JSON bodies (event streams, files, metrics)
#[derive(Debug)]
pub struct TextResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = StorageConfig {
            output_dir: temp_dir.path().join("output"),
            temp_dir: temp_dir.path().join("temp"),
        };
        std::fs::create_dir_all(&storage.output_dir).expect("Failed to create output dir");

        let mut config = Config {
            storage: storage.clone(),
            orchestrator: OrchestratorConfig {
                tick_interval_ms: 20,
                min_duration_ms: 0,
                ..OrchestratorConfig::default()
            },
            cleanup: CleanupConfig {
                enabled: false,
                ..CleanupConfig::default()
            },
            ..Config::default()
        };
        config.server.cors_origins = test_config.cors_origins.clone();
        if let Some(limit) = test_config.max_body_bytes {
            config.server.max_body_bytes = limit;
        }

        let fetcher = MockFetcher::new();
        let media = Arc::new(MediaProcessor::new(
            config.media.clone(),
            Arc::new(fetcher.clone()),
            storage.temp_dir.join("media"),
        ));

        let mut pipeline = GenerationPipeline::new(
            storage.clone(),
            config.orchestrator.clone(),
            ProgressChannel::new(config.progress.clone()),
            media,
            Arc::new(BasicHtmlAssembler::new()),
        );
        if test_config.enable_pdf {
            pipeline = pipeline.with_renderer(Arc::new(MockRenderer::new(OutputFormat::Pdf)));
        }

        let cleanup = CleanupManager::new(config.resolved_cleanup());
        let state = Arc::new(AppState::new(config, pipeline, cleanup.clone()));
        let router = create_router(state);

        Self {
            router,
            fetcher,
            cleanup,
            output_dir: storage.output_dir,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let text = self.send(request).await;
        TestResponse {
            status: text.status,
            headers: text.headers,
            body: serde_json::from_str(&text.text).unwrap_or(Value::Null),
        }
    }

    /// GET returning the body as text. Event streams are read to the end.
    pub async fn get_text(&self, path: &str) -> TextResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let text = self.send(request_builder.body(body).unwrap()).await;
        let body = if text.text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text.text).unwrap_or(Value::Null)
        };

        TestResponse {
            status: text.status,
            headers: text.headers,
            body,
        }
    }

    async fn send(&self, request: Request<Body>) -> TextResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        TextResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&body_bytes).into_owned(),
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Register a mock PDF renderer
    pub enable_pdf: bool,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// Override the request body limit
    pub max_body_bytes: Option<usize>,
}

impl TestConfig {
    /// Create config with PDF output enabled.
    pub fn with_pdf() -> Self {
        Self {
            enable_pdf: true,
            ..Default::default()
        }
    }
}

/// Parses the `data:` lines of an event stream body into JSON frames.
pub fn sse_frames(text: &str) -> Vec<Value> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str(data.trim()).ok())
        .collect()
}

/// A journal export as submitted by clients.
pub fn sample_export() -> Value {
    serde_json::to_value(fixtures::sample_entries()).expect("Failed to serialize entries")
}
