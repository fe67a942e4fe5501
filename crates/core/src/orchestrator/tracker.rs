//! Job tracker implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::progress::{ProgressChannel, TerminalStatus};

use super::config::OrchestratorConfig;
use super::estimator::{
    estimate_progress, expected_stage_duration, stall_nudge, STAGE_CEILING_MARGIN,
};
use super::types::{JobOutcome, JobSnapshot, Stage};

/// Mutable state of one job.
struct TrackerState {
    stage: Stage,
    /// Internal progress, never decreasing.
    progress: f64,
    /// Last value handed to the channel.
    published: f64,
    stage_started: Instant,
    /// When a stage change, measurement or the estimate last moved progress.
    last_advanced: Instant,
    processed: usize,
    total: usize,
    stalled: bool,
}

struct Inner {
    job_id: String,
    channel: ProgressChannel,
    config: OrchestratorConfig,
    started: Instant,
    state: Mutex<TrackerState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    completed: AtomicBool,
    destroyed: AtomicBool,
}

/// Drives one job through its stages and reports progress.
///
/// The tracker never fails: callers decide when a job has failed and report
/// it through [`complete`](Self::complete). Dropping the tracker stops its
/// background tick.
pub struct JobTracker {
    inner: Arc<Inner>,
}

/// Rounds down to one decimal so published values never overshoot.
fn publishable(progress: f64) -> f64 {
    (progress * 10.0 + 1e-9).floor() / 10.0
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_finished(&self) -> bool {
        self.completed.load(Ordering::SeqCst) || self.destroyed.load(Ordering::SeqCst)
    }

    /// Publishes the current progress if it moved past the last published value.
    fn publish(&self, state: &mut TrackerState, message: String, force: bool) {
        let value = publishable(state.progress);
        if !force && value <= state.published {
            return;
        }
        state.published = value;
        self.channel.emit(&self.job_id, value, message, state.stage);
    }

    /// One estimator step.
    fn tick(&self) {
        if self.is_finished() {
            return;
        }

        let mut state = self.state();
        if state.stalled {
            return;
        }

        let stage = state.stage;
        let elapsed_in_stage = state.stage_started.elapsed();
        let expected = expected_stage_duration(
            stage,
            state.total,
            self.started.elapsed(),
            &self.config,
        );
        let estimate = estimate_progress(stage, elapsed_in_stage, expected);

        if estimate > state.progress {
            state.progress = estimate.min(stage.ceiling() - STAGE_CEILING_MARGIN);
            state.last_advanced = Instant::now();
        } else {
            let Some(nudged) = stall_nudge(
                stage,
                state.progress,
                state.last_advanced.elapsed(),
                self.config.tick_interval(),
                self.config.stall_window(),
            ) else {
                return;
            };
            state.progress = nudged;
        }

        let mut message = stage.label().to_string();
        if state.total > self.config.large_job_threshold && state.processed > 0 {
            let percent = (state.processed as f64 / state.total as f64 * 100.0).round();
            message.push_str(&format!(" ({}% done)", percent));
        }

        trace!(
            "Progress tick for job {}: stage={}, progress={:.1}, in_stage={}ms",
            self.job_id,
            stage,
            state.progress,
            elapsed_in_stage.as_millis()
        );

        self.publish(&mut state, message, false);
    }

    fn stop_ticker(&self) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl JobTracker {
    /// Creates a tracker for `job_id` and starts its estimator tick.
    ///
    /// The job starts with the upload stage already complete. `total_entries`
    /// may be 0 when the count is not known yet (see [`set_total`](Self::set_total)).
    /// Must be called within a Tokio runtime.
    pub fn new(
        job_id: impl Into<String>,
        total_entries: usize,
        channel: ProgressChannel,
        config: OrchestratorConfig,
    ) -> Self {
        let job_id = job_id.into();
        let now = Instant::now();
        channel.register_job(&job_id);

        let inner = Arc::new(Inner {
            job_id,
            channel,
            started: now,
            state: Mutex::new(TrackerState {
                stage: Stage::Upload,
                progress: Stage::Upload.ceiling(),
                published: 0.0,
                stage_started: now,
                last_advanced: now,
                processed: 0,
                total: total_entries,
                stalled: false,
            }),
            ticker: Mutex::new(None),
            completed: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            config,
        });

        let handle = Self::spawn_ticker(Arc::downgrade(&inner), inner.config.tick_interval());
        *inner.ticker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        debug!(
            "Created job tracker for {} ({} entries)",
            inner.job_id, total_entries
        );

        Self { inner }
    }

    fn spawn_ticker(inner: Weak<Inner>, period: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if inner.is_finished() {
                    break;
                }
                inner.tick();
            }
        })
    }

    pub fn job_id(&self) -> &str {
        &self.inner.job_id
    }

    /// Enters `stage`: progress moves to the stage floor and an event is
    /// emitted immediately.
    ///
    /// Only forward transitions are accepted. Returns `false` (and emits
    /// nothing) for a stage at or before the current one, or once the job
    /// has finished.
    pub fn next_stage(&self, stage: Stage) -> bool {
        if self.inner.is_finished() {
            warn!(
                "Ignoring stage {} for finished job {}",
                stage, self.inner.job_id
            );
            return false;
        }

        let mut state = self.inner.state();
        if stage <= state.stage {
            warn!(
                "Rejected stage transition {} -> {} for job {}",
                state.stage, stage, self.inner.job_id
            );
            return false;
        }

        debug!(
            "Job {} entering stage {} at {}%",
            self.inner.job_id,
            stage,
            stage.floor()
        );

        state.stage = stage;
        state.stage_started = Instant::now();
        state.last_advanced = state.stage_started;
        state.progress = state.progress.max(stage.floor());
        state.stalled = false;
        self.inner.publish(&mut state, stage.label().to_string(), true);
        true
    }

    /// Completes the current stage: progress moves to its ceiling.
    pub fn complete_stage(&self) {
        if self.inner.is_finished() {
            return;
        }

        let mut state = self.inner.state();
        let stage = state.stage;
        state.progress = stage.ceiling();
        state.last_advanced = Instant::now();
        self.inner
            .publish(&mut state, format!("{} complete", stage.label()), true);
    }

    /// Records how many entries have been handled. Only annotates messages
    /// of large jobs; it does not move progress.
    pub fn update_processed(&self, processed: usize) {
        self.inner.state().processed = processed;
    }

    /// Sets the total entry count once it is known.
    pub fn set_total(&self, total: usize) {
        self.inner.state().total = total;
    }

    /// Pauses or resumes the time-based estimate.
    pub fn set_stalled(&self, stalled: bool) {
        self.inner.state().stalled = stalled;
    }

    /// Pushes a measured progress value into the current stage.
    ///
    /// The value is clamped to the stage's range (short of the ceiling) and
    /// ignored unless it moves progress forward.
    pub fn report(&self, progress: f64, message: impl Into<String>) {
        if self.inner.is_finished() {
            return;
        }

        let mut state = self.inner.state();
        let stage = state.stage;
        let value = progress.clamp(stage.floor(), stage.ceiling() - STAGE_CEILING_MARGIN);
        if value <= state.progress {
            return;
        }
        state.progress = value;
        state.last_advanced = Instant::now();
        self.inner.publish(&mut state, message.into(), false);
    }

    /// Ends the job with a terminal event. Only the first call has any
    /// effect; later calls return `false`.
    ///
    /// Small jobs hold the terminal event back until the configured minimum
    /// duration has passed since the tracker was created.
    pub async fn complete(&self, outcome: JobOutcome) -> bool {
        if self.inner.completed.swap(true, Ordering::SeqCst) {
            debug!("Job {} already completed", self.inner.job_id);
            return false;
        }
        self.inner.stop_ticker();

        let total = self.inner.state().total;
        if self.inner.config.is_small_job(total) {
            let release_at = self.inner.started + self.inner.config.min_duration();
            if Instant::now() < release_at {
                debug!(
                    "Holding terminal event of small job {} for {}ms",
                    self.inner.job_id,
                    (release_at - Instant::now()).as_millis()
                );
                tokio::time::sleep_until(release_at).await;
            }
        }

        let mut state = self.inner.state();
        let (message, status) = match outcome {
            JobOutcome::Success(result) => {
                state.stage = Stage::Finalize;
                state.progress = 100.0;
                (
                    "Generation complete".to_string(),
                    TerminalStatus::succeeded(result),
                )
            }
            JobOutcome::Failure(error) => {
                ("Generation failed".to_string(), TerminalStatus::failed(error))
            }
        };
        let value = publishable(state.progress);
        state.published = value;

        info!(
            "Job {} finished: success={}, progress={}, elapsed={}ms",
            self.inner.job_id,
            status.success,
            value,
            self.inner.started.elapsed().as_millis()
        );

        self.inner
            .channel
            .emit_terminal(&self.inner.job_id, value, message, state.stage, status);
        true
    }

    /// Stops the tracker. Idempotent and safe after [`complete`](Self::complete).
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.stop_ticker();
        debug!("Destroyed job tracker for {}", self.inner.job_id);
    }

    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn current_stage(&self) -> Stage {
        self.inner.state().stage
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.inner.state();
        JobSnapshot {
            job_id: self.inner.job_id.clone(),
            stage: state.stage,
            progress: publishable(state.progress),
            processed: state.processed,
            total: state.total,
            stalled: state.stalled,
            completed: self.is_completed(),
            elapsed_ms: self.inner.started.elapsed().as_millis() as u64,
        }
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.inner.stop_ticker();
    }
}

impl std::fmt::Debug for JobTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobTracker")
            .field("job_id", &self.inner.job_id)
            .finish()
    }
}
