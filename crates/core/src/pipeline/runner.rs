//! Generation pipeline implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::journal::{validate_entries, JournalEntry};
use crate::media::MediaProcessor;
use crate::metrics;
use crate::orchestrator::{JobOutcome, JobSnapshot, JobTracker, OrchestratorConfig, Stage};
use crate::progress::ProgressChannel;

use super::error::PipelineError;
use super::html::HtmlRenderer;
use super::options::{GenerationOptions, OutputFormat};
use super::traits::{ContentAssembler, DocumentRenderer};
use super::types::{artifact_filename, ArtifactInfo, PipelineStatus};

/// Longest accepted caller-supplied job id.
pub const MAX_JOB_ID_LEN: usize = 64;

/// Checks a caller-supplied job id. Ids become part of file names, so only
/// ASCII letters, digits, `-` and `_` are accepted.
pub fn validate_job_id(job_id: &str) -> Result<(), PipelineError> {
    if job_id.is_empty() || job_id.len() > MAX_JOB_ID_LEN {
        return Err(PipelineError::InvalidJobId(format!(
            "length must be between 1 and {}",
            MAX_JOB_ID_LEN
        )));
    }
    if !job_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(PipelineError::InvalidJobId(job_id.to_string()));
    }
    Ok(())
}

/// Shared state of the pipeline.
struct Inner {
    storage: StorageConfig,
    orchestrator: OrchestratorConfig,
    channel: ProgressChannel,
    media: Arc<MediaProcessor>,
    assembler: Arc<dyn ContentAssembler>,
    renderers: HashMap<OutputFormat, Arc<dyn DocumentRenderer>>,
    active_jobs: RwLock<HashMap<String, Arc<JobTracker>>>,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

/// Runs generation jobs: validate, resolve media, assemble, render.
///
/// Each job gets its own [`JobTracker`] publishing on the shared
/// [`ProgressChannel`]. The pipeline is the single place that decides a job
/// failed; on failure the tracker is completed unsuccessfully and destroyed
/// and no artifact is left behind.
#[derive(Clone)]
pub struct GenerationPipeline {
    inner: Arc<Inner>,
}

impl GenerationPipeline {
    /// Creates a pipeline with the built-in HTML renderer registered.
    pub fn new(
        storage: StorageConfig,
        orchestrator: OrchestratorConfig,
        channel: ProgressChannel,
        media: Arc<MediaProcessor>,
        assembler: Arc<dyn ContentAssembler>,
    ) -> Self {
        let mut renderers: HashMap<OutputFormat, Arc<dyn DocumentRenderer>> = HashMap::new();
        renderers.insert(OutputFormat::Html, Arc::new(HtmlRenderer::new()));

        Self {
            inner: Arc::new(Inner {
                storage,
                orchestrator,
                channel,
                media,
                assembler,
                renderers,
                active_jobs: RwLock::new(HashMap::new()),
                total_processed: AtomicU64::new(0),
                total_failed: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a renderer for its format, replacing any previous one.
    ///
    /// Must be called before the pipeline is cloned.
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.renderers.insert(renderer.format(), renderer);
            }
            None => warn!(
                "Ignoring renderer {}: pipeline already shared",
                renderer.name()
            ),
        }
        self
    }

    pub fn channel(&self) -> &ProgressChannel {
        &self.inner.channel
    }

    /// Formats that can currently be produced.
    pub fn supported_formats(&self) -> Vec<OutputFormat> {
        let mut formats: Vec<_> = self.inner.renderers.keys().copied().collect();
        formats.sort_by_key(|f| f.extension());
        formats
    }

    /// Starts a job in the background and returns its id.
    ///
    /// Fails without starting anything if the job id is invalid or already
    /// running, or if no renderer exists for the requested format. Entry
    /// validation happens inside the job and is reported as a failed
    /// terminal event.
    pub async fn submit(
        &self,
        entries: Vec<JournalEntry>,
        options: GenerationOptions,
        job_id: Option<String>,
    ) -> Result<String, PipelineError> {
        let tracker = self.prepare(&entries, &options, job_id).await?;
        let job_id = tracker.job_id().to_string();

        let pipeline = self.clone();
        tokio::spawn(async move {
            let _ = pipeline.execute(tracker, entries, options).await;
        });

        Ok(job_id)
    }

    /// Runs a job to completion on the current task.
    pub async fn run(
        &self,
        entries: Vec<JournalEntry>,
        options: GenerationOptions,
        job_id: Option<String>,
    ) -> Result<ArtifactInfo, PipelineError> {
        let tracker = self.prepare(&entries, &options, job_id).await?;
        self.execute(tracker, entries, options).await
    }

    /// Returns the current pipeline status.
    pub async fn status(&self) -> PipelineStatus {
        let jobs = self.inner.active_jobs.read().await;
        let mut snapshots: Vec<JobSnapshot> = jobs.values().map(|t| t.snapshot()).collect();
        snapshots.sort_by(|a, b| b.elapsed_ms.cmp(&a.elapsed_ms));

        PipelineStatus {
            running: snapshots.len(),
            jobs: snapshots,
            total_processed: self.inner.total_processed.load(Ordering::Relaxed),
            total_failed: self.inner.total_failed.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of a running job.
    pub async fn job(&self, job_id: &str) -> Option<JobSnapshot> {
        self.inner
            .active_jobs
            .read()
            .await
            .get(job_id)
            .map(|t| t.snapshot())
    }

    async fn prepare(
        &self,
        entries: &[JournalEntry],
        options: &GenerationOptions,
        job_id: Option<String>,
    ) -> Result<Arc<JobTracker>, PipelineError> {
        let job_id = match job_id {
            Some(id) => {
                validate_job_id(&id)?;
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        if !self.inner.renderers.contains_key(&options.output_format) {
            return Err(PipelineError::UnsupportedFormat(options.output_format));
        }

        let mut jobs = self.inner.active_jobs.write().await;
        if jobs.contains_key(&job_id) {
            return Err(PipelineError::JobExists(job_id));
        }

        let tracker = Arc::new(JobTracker::new(
            job_id.clone(),
            entries.len(),
            self.inner.channel.clone(),
            self.inner.orchestrator.clone(),
        ));
        jobs.insert(job_id.clone(), Arc::clone(&tracker));

        metrics::JOBS_STARTED.inc();
        metrics::JOBS_ACTIVE.inc();
        info!(
            "Job {} accepted: {} entries, format={}",
            job_id,
            entries.len(),
            options.output_format
        );

        Ok(tracker)
    }

    async fn execute(
        &self,
        tracker: Arc<JobTracker>,
        entries: Vec<JournalEntry>,
        options: GenerationOptions,
    ) -> Result<ArtifactInfo, PipelineError> {
        let start = Instant::now();
        let job_id = tracker.job_id().to_string();

        let result = self.generate(&tracker, entries, &options).await;

        self.inner.media.cleanup_job(&job_id).await;

        let outcome = match &result {
            Ok(artifact) => JobOutcome::Success(serde_json::to_value(artifact).ok()),
            Err(e) => JobOutcome::Failure(e.to_string()),
        };
        tracker.complete(outcome).await;
        tracker.destroy();

        self.inner.active_jobs.write().await.remove(&job_id);
        metrics::JOBS_ACTIVE.dec();

        let label = match &result {
            Ok(artifact) => {
                self.inner.total_processed.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Job {} produced {} ({} bytes) in {}ms",
                    job_id,
                    artifact.filename,
                    artifact.size_bytes,
                    start.elapsed().as_millis()
                );
                "success"
            }
            Err(e) => {
                self.inner.total_failed.fetch_add(1, Ordering::Relaxed);
                error!("Job {} failed: {}", job_id, e);
                "failed"
            }
        };
        metrics::JOBS_FINISHED.with_label_values(&[label]).inc();
        metrics::JOB_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn generate(
        &self,
        tracker: &JobTracker,
        entries: Vec<JournalEntry>,
        options: &GenerationOptions,
    ) -> Result<ArtifactInfo, PipelineError> {
        let job_id = tracker.job_id();

        // Validate
        tracker.next_stage(Stage::Validate);
        let stats = validate_entries(&entries)?;
        tracker.set_total(stats.total_entries);
        debug!(
            "Job {} validated: {} entries, {} with images, {} with audio",
            job_id, stats.total_entries, stats.with_images, stats.with_audio
        );
        tracker.complete_stage();

        // Process media
        tracker.next_stage(Stage::Process);
        let entries = if options.include_images || options.include_audio {
            let processed = self
                .inner
                .media
                .process(job_id, entries, options.media_selection(), Some(tracker))
                .await;
            info!(
                "Job {} media: {} encoded, {} fallback, {} described",
                job_id,
                processed.count("encoded"),
                processed.count("fallback"),
                processed.count("described")
            );
            processed.entries
        } else {
            entries
        };
        tracker.update_processed(entries.len());
        tracker.complete_stage();

        // Generate
        tracker.next_stage(Stage::Generate);
        let document = self.inner.assembler.assemble(&entries, options).await?;
        debug!(
            "Job {} assembled {} bytes with {}",
            job_id,
            document.len(),
            self.inner.assembler.name()
        );
        tracker.complete_stage();

        // Finalize
        tracker.next_stage(Stage::Finalize);
        let renderer = self
            .inner
            .renderers
            .get(&options.output_format)
            .ok_or(PipelineError::UnsupportedFormat(options.output_format))?;

        let format = renderer.format();
        let temp_path = self
            .inner
            .storage
            .temp_dir
            .join(format!("{}.{}", job_id, format.extension()));

        let size = match renderer.render(&document, options, &temp_path).await {
            Ok(size) => size,
            Err(e) => {
                remove_if_exists(&temp_path).await;
                return Err(e.into());
            }
        };

        let (filename, output_path) =
            free_artifact_path(&self.inner.storage.output_dir, job_id, format).await;
        if let Err(e) = move_file(&temp_path, &output_path).await {
            remove_if_exists(&temp_path).await;
            remove_if_exists(&output_path).await;
            return Err(e.into());
        }

        Ok(ArtifactInfo::new(
            job_id,
            filename,
            format,
            entries.len(),
            size,
        ))
    }
}

/// First artifact name for `job_id` not already present in `output_dir`.
async fn free_artifact_path(
    output_dir: &Path,
    job_id: &str,
    format: OutputFormat,
) -> (String, PathBuf) {
    let date = Utc::now().date_naive();
    let mut copy = 0;
    loop {
        let filename = artifact_filename(job_id, date, format, copy);
        let path = output_dir.join(&filename);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return (filename, path);
        }
        copy += 1;
    }
}

/// Moves `from` to `to`, copying when a rename is not possible.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
