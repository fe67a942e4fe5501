//! Media processor implementation.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Url;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

use crate::journal::{AudioInfo, JournalEntry};
use crate::metrics;
use crate::orchestrator::{JobTracker, Stage};

use super::audio::{describe_audio, fallback_audio_info};
use super::config::MediaConfig;
use super::error::MediaError;
use super::traits::MediaFetcher;
use super::transcode::{to_data_uri, transcode_image};
use super::types::{
    collect_references, MediaKind, MediaOutcome, MediaReference, MediaSelection, ProcessedMedia,
    ResolvedMedia,
};

/// Resolves the media of journal entries.
///
/// One processor is shared by all jobs; its fetch semaphore bounds network
/// operations across them.
pub struct MediaProcessor {
    config: MediaConfig,
    fetcher: Arc<dyn MediaFetcher>,
    fetch_permits: Arc<Semaphore>,
    staging_root: PathBuf,
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, MediaError>>,
) -> Result<T, MediaError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| MediaError::Timeout {
            timeout_secs: limit.as_secs(),
        })?
}

impl MediaProcessor {
    /// Creates a processor. Staged audio goes under `staging_root/<job_id>`.
    pub fn new(
        config: MediaConfig,
        fetcher: Arc<dyn MediaFetcher>,
        staging_root: impl Into<PathBuf>,
    ) -> Self {
        let fetch_permits = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        Self {
            config,
            fetcher,
            fetch_permits,
            staging_root: staging_root.into(),
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Directory holding the staged media of a job.
    pub fn staging_dir(&self, job_id: &str) -> PathBuf {
        self.staging_root.join(job_id)
    }

    /// Network operations currently allowed to start.
    pub fn available_fetch_permits(&self) -> usize {
        self.fetch_permits.available_permits()
    }

    /// Resolves every media reference in `entries` and substitutes the
    /// outcomes back in.
    ///
    /// References are handled in batches of `batch_size`; each batch settles
    /// completely, progress is reported through `tracker`, and control is
    /// yielded before the next batch starts. Individual failures degrade to
    /// the original locator, so every reference yields exactly one outcome.
    pub async fn process(
        &self,
        job_id: &str,
        mut entries: Vec<JournalEntry>,
        selection: MediaSelection,
        tracker: Option<&JobTracker>,
    ) -> ProcessedMedia {
        let references = collect_references(&entries);
        let mut outcomes: Vec<Option<MediaOutcome>> = vec![None; references.len()];

        let work: Vec<usize> = references
            .iter()
            .enumerate()
            .filter(|(_, r)| selection.includes(r.kind))
            .map(|(idx, _)| idx)
            .collect();

        info!(
            "Job {}: resolving {} of {} media references (skip_download={})",
            job_id,
            work.len(),
            references.len(),
            self.config.skip_download
        );

        let batch_size = self.config.batch_size.max(1);
        let total = work.len();
        let mut done = 0;

        for batch in work.chunks(batch_size) {
            let results = join_all(
                batch
                    .iter()
                    .map(|&idx| self.resolve(job_id, &references[idx])),
            )
            .await;

            for (&idx, outcome) in batch.iter().zip(results) {
                outcomes[idx] = Some(outcome);
            }

            done += batch.len();
            if let Some(tracker) = tracker {
                Self::report(tracker, done, total, entries.len());
            }

            tokio::task::yield_now().await;
        }

        let mut resolved = Vec::with_capacity(references.len());
        for (reference, outcome) in references.into_iter().zip(outcomes) {
            let outcome = outcome.unwrap_or(MediaOutcome::PassThrough);
            metrics::MEDIA_OUTCOMES
                .with_label_values(&[reference.kind.as_str(), outcome.label()])
                .inc();
            Self::substitute(&mut entries, &reference, &outcome);
            resolved.push(ResolvedMedia { reference, outcome });
        }

        let processed = ProcessedMedia { entries, resolved };
        info!(
            "Job {}: media resolved (encoded={}, fallback={}, audio={}, passthrough={})",
            job_id,
            processed.count("encoded"),
            processed.count("fallback"),
            processed.count("described"),
            processed.count("passthrough")
        );
        processed
    }

    /// Maps batch completion into the process stage.
    fn report(tracker: &JobTracker, done: usize, total: usize, entry_count: usize) {
        if total == 0 {
            return;
        }
        let fraction = done as f64 / total as f64;
        let (floor, ceiling) = Stage::Process.range();
        let progress = floor + (fraction * (ceiling - floor)).round();

        tracker.update_processed((fraction * entry_count as f64).round() as usize);
        tracker.report(progress, format!("Processed {} of {} media items", done, total));
    }

    fn substitute(entries: &mut [JournalEntry], reference: &MediaReference, outcome: &MediaOutcome) {
        let Some(entry) = entries.get_mut(reference.entry_index) else {
            return;
        };
        match outcome {
            MediaOutcome::Encoded { data_uri } => {
                if let Some(item) = reference
                    .sub_index
                    .and_then(|sub| entry.album.as_mut().and_then(|a| a.get_mut(sub)))
                {
                    item.url = data_uri.clone();
                }
            }
            MediaOutcome::Audio { info } => entry.audio_info = Some(info.clone()),
            MediaOutcome::Original { .. } | MediaOutcome::PassThrough => {}
        }
    }

    async fn resolve(&self, job_id: &str, reference: &MediaReference) -> MediaOutcome {
        if self.config.skip_download {
            return MediaOutcome::PassThrough;
        }
        match reference.kind {
            MediaKind::Image => self.resolve_image(job_id, &reference.url).await,
            MediaKind::Audio => {
                self.resolve_audio(job_id, reference.entry_index, &reference.url)
                    .await
            }
            MediaKind::Video => MediaOutcome::PassThrough,
        }
    }

    fn parse_locator(&self, raw: &str) -> Result<Url, MediaError> {
        let url = Url::parse(raw).map_err(|e| MediaError::invalid_url(raw, e))?;
        if !self.config.allows_scheme(url.scheme()) {
            return Err(MediaError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }
        Ok(url)
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, MediaError> {
        self.fetch_permits
            .acquire()
            .await
            .map_err(|_| MediaError::fetch("fetch pool closed"))
    }

    async fn resolve_image(&self, job_id: &str, raw: &str) -> MediaOutcome {
        match self.encode_image(raw).await {
            Ok(data_uri) => {
                debug!("Job {}: encoded image {}", job_id, raw);
                MediaOutcome::Encoded { data_uri }
            }
            Err(e) => {
                warn!("Job {}: keeping original image {}: {}", job_id, raw, e);
                metrics::MEDIA_FAILURES
                    .with_label_values(&["image", e.kind()])
                    .inc();
                MediaOutcome::Original {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn encode_image(&self, raw: &str) -> Result<String, MediaError> {
        let url = self.parse_locator(raw)?;

        let bytes = {
            let _permit = self.acquire().await?;
            with_timeout(
                self.config.image_timeout(),
                self.fetcher.fetch_image(&url, self.config.max_image_bytes),
            )
            .await?
        };

        let (width, height, quality) = (
            self.config.image_max_width,
            self.config.image_max_height,
            self.config.image_quality,
        );
        let jpeg = tokio::task::spawn_blocking(move || {
            transcode_image(&bytes, width, height, quality)
        })
        .await
        .map_err(|e| MediaError::Transcode(e.to_string()))??;

        Ok(to_data_uri(&jpeg))
    }

    async fn resolve_audio(&self, job_id: &str, entry_index: usize, raw: &str) -> MediaOutcome {
        let url = match self.parse_locator(raw) {
            Ok(url) => url,
            Err(e) => {
                debug!("Job {}: not probing audio {}: {}", job_id, raw, e);
                return MediaOutcome::Audio {
                    info: fallback_audio_info(raw),
                };
            }
        };

        let probe = {
            let permit = self.acquire().await;
            match permit {
                Ok(_permit) => {
                    with_timeout(
                        self.config.audio_probe_timeout(),
                        self.fetcher.probe_audio(&url),
                    )
                    .await
                }
                Err(e) => Err(e),
            }
        };

        let probe = match probe {
            Ok(probe) => probe,
            Err(e) => {
                warn!("Job {}: audio probe failed for {}: {}", job_id, raw, e);
                metrics::MEDIA_FAILURES
                    .with_label_values(&["audio", e.kind()])
                    .inc();
                return MediaOutcome::Audio {
                    info: fallback_audio_info(raw),
                };
            }
        };

        let mut info = describe_audio(raw, &probe);

        if self.config.embed_audio {
            match probe.content_length {
                Some(len) if len <= self.config.audio_size_ceiling_bytes => {
                    match self.stage_audio(job_id, entry_index, &url, &info).await {
                        Ok(path) => info.staged_path = Some(path),
                        Err(e) => warn!("Job {}: could not stage audio {}: {}", job_id, raw, e),
                    }
                }
                Some(len) => debug!(
                    "Job {}: audio {} is {} bytes, above ceiling; passing locator through",
                    job_id, raw, len
                ),
                None => debug!(
                    "Job {}: audio {} has unknown size; passing locator through",
                    job_id, raw
                ),
            }
        }

        MediaOutcome::Audio { info }
    }

    async fn stage_audio(
        &self,
        job_id: &str,
        entry_index: usize,
        url: &Url,
        info: &AudioInfo,
    ) -> Result<PathBuf, MediaError> {
        let bytes = {
            let _permit = self.acquire().await?;
            with_timeout(
                self.config.image_timeout(),
                self.fetcher
                    .fetch_audio(url, self.config.audio_size_ceiling_bytes),
            )
            .await?
        };

        let extension = info
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "mp3".to_string());

        let dir = self.staging_dir(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("audio-{}.{}", entry_index, extension));
        tokio::fs::write(&path, &bytes).await?;

        debug!(
            "Job {}: staged {} bytes of audio at {}",
            job_id,
            bytes.len(),
            path.display()
        );
        Ok(path)
    }

    /// Removes the staged media of a job. Missing directories are fine.
    pub async fn cleanup_job(&self, job_id: &str) {
        let dir = self.staging_dir(job_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Job {}: removed media staging dir {}", job_id, dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Job {}: failed to remove media staging dir {}: {}",
                job_id,
                dir.display(),
                e
            ),
        }
    }
}
