//! Generation job lifecycle integration tests.
//!
//! These tests run whole jobs through the pipeline with mock collaborators:
//! - Terminal events and artifact placement
//! - Graceful degradation of failing media
//! - Failure handling (no artifact left behind)
//! - Observer reconnect and replay

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use diarypress_core::{
    journal::AlbumKind,
    testing::{fixtures, MockAssembler, MockFetcher, MockRenderer},
    BasicHtmlAssembler, GenerationOptions, GenerationPipeline, JournalEntry, MediaConfig, MediaProcessor,
    OrchestratorConfig, OutputFormat, PipelineError, ProgressChannel, RenderError,
    StorageConfig, StreamFrame, Subscription,
};

/// Test helper wiring a pipeline to mocks inside a temp directory.
struct TestHarness {
    pipeline: GenerationPipeline,
    channel: ProgressChannel,
    fetcher: MockFetcher,
    assembler: MockAssembler,
    storage: StorageConfig,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        Self::build(fast_orchestrator(), None).await
    }

    async fn with_renderer(renderer: MockRenderer) -> Self {
        Self::build(fast_orchestrator(), Some(renderer)).await
    }

    async fn build(orchestrator: OrchestratorConfig, renderer: Option<MockRenderer>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = StorageConfig {
            output_dir: temp_dir.path().join("output"),
            temp_dir: temp_dir.path().join("temp"),
        };

        let channel = ProgressChannel::default();
        let fetcher = MockFetcher::new();
        let assembler = MockAssembler::new();
        let media = Arc::new(MediaProcessor::new(
            MediaConfig::default(),
            Arc::new(fetcher.clone()),
            storage.temp_dir.join("media"),
        ));

        let mut pipeline = GenerationPipeline::new(
            storage.clone(),
            orchestrator,
            channel.clone(),
            media,
            Arc::new(assembler.clone()),
        );
        if let Some(renderer) = renderer {
            pipeline = pipeline.with_renderer(Arc::new(renderer));
        }

        Self {
            pipeline,
            channel,
            fetcher,
            assembler,
            storage,
            _temp_dir: temp_dir,
        }
    }

    fn output_files(&self) -> Vec<String> {
        list_files(&self.storage.output_dir)
    }

    fn temp_files(&self) -> Vec<String> {
        list_files(&self.storage.temp_dir)
    }
}

fn fast_orchestrator() -> OrchestratorConfig {
    OrchestratorConfig {
        tick_interval_ms: 20,
        min_duration_ms: 0,
        ..OrchestratorConfig::default()
    }
}

fn list_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Reads frames until the terminal one (inclusive).
async fn collect_until_complete(sub: &mut Subscription) -> Vec<StreamFrame> {
    let mut frames = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(frame) = sub.recv().await {
            let done = frame.is_complete();
            frames.push(frame);
            if done {
                break;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "Timed out waiting for terminal frame");
    frames
}

fn terminal(frames: &[StreamFrame]) -> &StreamFrame {
    frames
        .last()
        .filter(|f| f.is_complete())
        .expect("Last frame should be terminal")
}

// =============================================================================
// Successful Jobs
// =============================================================================

#[tokio::test]
async fn test_job_with_failing_image_still_succeeds() {
    let harness = TestHarness::new().await;
    harness
        .fetcher
        .add_image("https://img.test/good.png", fixtures::png_bytes(1000, 1000))
        .await;
    harness.fetcher.fail_url("https://img.test/bad.png").await;

    let entries = vec![
        JournalEntry::text("2024-02-01", "good image")
            .with_album_item(AlbumKind::Image, "https://img.test/good.png"),
        JournalEntry::text("2024-02-02", "bad image")
            .with_album_item(AlbumKind::Image, "https://img.test/bad.png"),
        JournalEntry::text("2024-02-03", "no media"),
    ];

    let mut sub = harness.channel.subscribe("job-images");
    let job_id = harness
        .pipeline
        .submit(entries, GenerationOptions::default(), Some("job-images".into()))
        .await
        .unwrap();
    assert_eq!(job_id, "job-images");

    let frames = collect_until_complete(&mut sub).await;
    assert!(matches!(frames[0], StreamFrame::Connected { .. }));

    match terminal(&frames) {
        StreamFrame::Complete {
            success,
            progress,
            result,
            error,
            ..
        } => {
            assert!(*success);
            assert_eq!(*progress, 100.0);
            assert!(error.is_none());
            let result = result.as_ref().unwrap();
            assert_eq!(result["jobId"], "job-images");
            assert_eq!(result["outputFormat"], "html");
            assert_eq!(result["entryCount"], 3);
            let filename = result["filename"].as_str().unwrap();
            assert!(filename.starts_with("journal-"));
            assert!(filename.ends_with("-job-imag.html"));
            assert_eq!(result["downloadUrl"], format!("/downloads/{}", filename));
        }
        other => panic!("unexpected frame: {other:?}"),
    }

    assert_eq!(harness.output_files().len(), 1);
    assert!(harness.temp_files().is_empty());

    let assemblies = harness.assembler.recorded_assemblies().await;
    assert_eq!(assemblies.len(), 1);
    let entries = &assemblies[0].entries;
    assert!(entries[0].album.as_ref().unwrap()[0]
        .url
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(
        entries[1].album.as_ref().unwrap()[0].url,
        "https://img.test/bad.png"
    );
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let harness = TestHarness::new().await;
    let mut sub = harness.channel.subscribe("job-monotonic");

    harness
        .pipeline
        .submit(
            fixtures::entries_with_images(12),
            GenerationOptions::default(),
            Some("job-monotonic".into()),
        )
        .await
        .unwrap();

    let frames = collect_until_complete(&mut sub).await;
    let values: Vec<f64> = frames.iter().filter_map(|f| f.progress()).collect();
    assert!(values.len() >= 5, "Expected stage events, got {values:?}");
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "Progress went backwards: {values:?}");
    }
}

#[tokio::test]
async fn test_run_returns_artifact() {
    let harness = TestHarness::new().await;

    let artifact = harness
        .pipeline
        .run(fixtures::sample_entries(), GenerationOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(artifact.entry_count, 4);
    assert_eq!(artifact.output_format, OutputFormat::Html);
    let path = harness.storage.output_dir.join(&artifact.filename);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), artifact.size_bytes);
    assert!(artifact.filename.starts_with("journal-"));
    assert!(artifact
        .filename
        .ends_with(&format!("-{}.html", artifact.job_id)));
}

#[tokio::test]
async fn test_finished_jobs_keep_separate_artifacts() {
    let harness = TestHarness::new().await;

    let first = harness
        .pipeline
        .run(
            fixtures::text_entries(2),
            GenerationOptions::default(),
            Some("holiday-2023".to_string()),
        )
        .await
        .unwrap();
    let second = harness
        .pipeline
        .run(
            fixtures::text_entries(3),
            GenerationOptions::default(),
            Some("holiday-2024".to_string()),
        )
        .await
        .unwrap();
    // Same id again once the first run has finished
    let third = harness
        .pipeline
        .run(
            fixtures::text_entries(4),
            GenerationOptions::default(),
            Some("holiday-2023".to_string()),
        )
        .await
        .unwrap();

    assert_ne!(first.filename, second.filename);
    assert_ne!(first.filename, third.filename);
    assert!(third.filename.ends_with("-holiday-2023-1.html"));
    assert_eq!(harness.output_files().len(), 3);
}

#[tokio::test]
async fn test_staged_audio_embedded_in_document() {
    let temp_dir = TempDir::new().unwrap();
    let storage = StorageConfig {
        output_dir: temp_dir.path().join("output"),
        temp_dir: temp_dir.path().join("temp"),
    };
    let fetcher = MockFetcher::new();
    fetcher
        .add_audio("https://audio.test/note.mp3", "audio/mpeg", 12)
        .await;
    let media = Arc::new(MediaProcessor::new(
        MediaConfig {
            embed_audio: true,
            ..MediaConfig::default()
        },
        Arc::new(fetcher.clone()),
        storage.temp_dir.join("media"),
    ));
    let pipeline = GenerationPipeline::new(
        storage.clone(),
        fast_orchestrator(),
        ProgressChannel::default(),
        media,
        Arc::new(BasicHtmlAssembler::new()),
    );

    let entries =
        vec![JournalEntry::text("2024-01-01", "memo").with_audio("https://audio.test/note.mp3")];
    let artifact = pipeline
        .run(entries, GenerationOptions::default(), Some("voice".to_string()))
        .await
        .unwrap();

    let doc = std::fs::read_to_string(storage.output_dir.join(&artifact.filename)).unwrap();
    assert!(doc.contains("src=\"data:audio/mpeg;base64,"));
    assert!(doc.contains("href=\"https://audio.test/note.mp3\""));
    assert_eq!(fetcher.body_downloads("https://audio.test/note.mp3").await, 1);
    // Staged copies are gone once the job is done
    assert!(!storage.temp_dir.join("media").join("voice").exists());
}

#[tokio::test]
async fn test_excluded_media_not_fetched() {
    let harness = TestHarness::new().await;
    let options = GenerationOptions {
        include_images: false,
        include_audio: false,
        ..GenerationOptions::default()
    };

    harness
        .pipeline
        .run(fixtures::sample_entries(), options, None)
        .await
        .unwrap();

    assert!(harness.fetcher.requests().await.is_empty());
}

#[tokio::test]
async fn test_pdf_with_registered_renderer() {
    let renderer = MockRenderer::new(OutputFormat::Pdf);
    let harness = TestHarness::with_renderer(renderer.clone()).await;

    let options = GenerationOptions::default().with_format(OutputFormat::Pdf);
    let artifact = harness
        .pipeline
        .run(fixtures::text_entries(2), options, Some("pdf-job".into()))
        .await
        .unwrap();

    assert!(artifact.filename.ends_with("-pdf-job.pdf"));
    let renders = renderer.recorded_renders().await;
    assert_eq!(renders.len(), 1);
    assert!(renders[0].output.starts_with(&harness.storage.temp_dir));
}

// =============================================================================
// Failed Jobs
// =============================================================================

#[tokio::test]
async fn test_invalid_entries_fail_without_artifact() {
    let harness = TestHarness::new().await;
    let mut sub = harness.channel.subscribe("job-invalid");

    let entries = vec![
        JournalEntry::text("2024-01-01", "fine"),
        JournalEntry::text("not a date", "broken"),
    ];
    harness
        .pipeline
        .submit(entries, GenerationOptions::default(), Some("job-invalid".into()))
        .await
        .unwrap();

    let frames = collect_until_complete(&mut sub).await;
    match terminal(&frames) {
        StreamFrame::Complete {
            success, error, ..
        } => {
            assert!(!*success);
            assert!(error.as_deref().unwrap().contains("invalid"));
        }
        other => panic!("unexpected frame: {other:?}"),
    }

    assert!(harness.output_files().is_empty());
    assert!(harness.assembler.recorded_assemblies().await.is_empty());
}

#[tokio::test]
async fn test_render_failure_leaves_no_artifact() {
    let renderer = MockRenderer::new(OutputFormat::Pdf);
    renderer.set_partial_write(true).await;
    renderer
        .set_next_error(RenderError::render_failed("printer on fire", None))
        .await;
    let harness = TestHarness::with_renderer(renderer).await;

    let options = GenerationOptions::default().with_format(OutputFormat::Pdf);
    let result = harness
        .pipeline
        .run(fixtures::text_entries(3), options, Some("job-render".into()))
        .await;

    assert!(matches!(result, Err(PipelineError::Render(_))));
    assert!(harness.output_files().is_empty());
    assert!(harness.temp_files().is_empty());

    let cached = harness.channel.cached_event("job-render").unwrap();
    let status = cached.terminal.unwrap();
    assert!(!status.success);
    assert!(status.error.unwrap().contains("printer on fire"));
}

#[tokio::test]
async fn test_assembly_failure_reported() {
    let harness = TestHarness::new().await;
    harness
        .assembler
        .set_next_error(RenderError::Assembly("template missing".into()))
        .await;

    let result = harness
        .pipeline
        .run(fixtures::text_entries(1), GenerationOptions::default(), None)
        .await;

    assert!(result.is_err());
    let status = harness.pipeline.status().await;
    assert_eq!(status.total_failed, 1);
    assert_eq!(status.total_processed, 0);
    assert_eq!(status.running, 0);
}

// =============================================================================
// Submission Errors
// =============================================================================

#[tokio::test]
async fn test_rejects_invalid_job_id() {
    let harness = TestHarness::new().await;
    let result = harness
        .pipeline
        .submit(
            fixtures::text_entries(1),
            GenerationOptions::default(),
            Some("../../etc".into()),
        )
        .await;
    assert!(matches!(result, Err(PipelineError::InvalidJobId(_))));
    assert!(harness.channel.cached_event("../../etc").is_none());
}

#[tokio::test]
async fn test_rejects_format_without_renderer() {
    let harness = TestHarness::new().await;
    let options = GenerationOptions::default().with_format(OutputFormat::Pdf);
    let result = harness
        .pipeline
        .submit(fixtures::text_entries(1), options, None)
        .await;
    assert!(matches!(
        result,
        Err(PipelineError::UnsupportedFormat(OutputFormat::Pdf))
    ));
}

#[tokio::test]
async fn test_rejects_duplicate_running_job() {
    let renderer = MockRenderer::new(OutputFormat::Pdf);
    renderer.set_delay(Duration::from_millis(300)).await;
    let harness = TestHarness::with_renderer(renderer).await;
    let options = GenerationOptions::default().with_format(OutputFormat::Pdf);

    harness
        .pipeline
        .submit(fixtures::text_entries(1), options.clone(), Some("dup".into()))
        .await
        .unwrap();
    let second = harness
        .pipeline
        .submit(fixtures::text_entries(1), options, Some("dup".into()))
        .await;
    assert!(matches!(second, Err(PipelineError::JobExists(_))));

    let status = harness.pipeline.status().await;
    assert_eq!(status.running, 1);
    assert_eq!(status.jobs[0].job_id, "dup");
}

// =============================================================================
// Timing and Replay
// =============================================================================

#[tokio::test]
async fn test_small_job_terminal_event_is_held_back() {
    let harness = TestHarness::build(
        OrchestratorConfig {
            tick_interval_ms: 50,
            ..OrchestratorConfig::default()
        },
        None,
    )
    .await;
    let mut sub = harness.channel.subscribe("small-job");

    let started = Instant::now();
    harness
        .pipeline
        .submit(
            fixtures::text_entries(2),
            GenerationOptions::default(),
            Some("small-job".into()),
        )
        .await
        .unwrap();

    let frames = collect_until_complete(&mut sub).await;
    assert!(terminal(&frames).is_complete());
    assert!(started.elapsed() >= Duration::from_millis(1500));
}

#[tokio::test]
async fn test_reconnect_after_completion_replays_terminal() {
    let harness = TestHarness::new().await;
    harness
        .pipeline
        .run(
            fixtures::text_entries(1),
            GenerationOptions::default(),
            Some("replayed".into()),
        )
        .await
        .unwrap();

    let mut sub = harness.channel.subscribe("replayed");
    let first = sub.recv().await.unwrap();
    assert!(matches!(first, StreamFrame::Connected { .. }));

    let second = sub.recv().await.unwrap();
    assert!(second.is_complete());
    assert!(second.is_cached());

    assert!(sub.recv().await.is_none());
}
