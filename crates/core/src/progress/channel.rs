//! The in-process progress registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::orchestrator::Stage;

use super::config::ProgressConfig;
use super::types::{ProgressEvent, StreamFrame, TerminalStatus};

/// Identifies one observer registration.
pub type ObserverId = u64;

struct CachedEvent {
    event: ProgressEvent,
    stored_at: Instant,
}

#[derive(Default)]
struct JobEntry {
    observers: HashMap<ObserverId, mpsc::UnboundedSender<StreamFrame>>,
    cached: Option<CachedEvent>,
    started_at: Option<Instant>,
}

impl JobEntry {
    fn is_idle(&self) -> bool {
        self.observers.is_empty() && self.cached.is_none() && self.started_at.is_none()
    }
}

struct Inner {
    config: ProgressConfig,
    jobs: Mutex<HashMap<String, JobEntry>>,
    next_observer: AtomicU64,
}

/// Publish/subscribe registry keyed by job identifier.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct ProgressChannel {
    inner: Arc<Inner>,
}

/// An observer registration.
///
/// Frames arrive in publish order. The registration is removed when the
/// handle is dropped or passed to [`ProgressChannel::unsubscribe`].
pub struct Subscription {
    job_id: String,
    id: ObserverId,
    rx: mpsc::UnboundedReceiver<StreamFrame>,
    channel: ProgressChannel,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Waits for the next frame. Returns `None` once the job's observers
    /// have been torn down.
    pub async fn recv(&mut self) -> Option<StreamFrame> {
        self.rx.recv().await
    }

    /// Returns a buffered frame without waiting.
    pub fn try_recv(&mut self) -> Option<StreamFrame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channel.remove_observer(&self.job_id, self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("job_id", &self.job_id)
            .field("id", &self.id)
            .finish()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}

impl ProgressChannel {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                jobs: Mutex::new(HashMap::new()),
                next_observer: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.inner.config
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, JobEntry>> {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the start instant of a job. Elapsed and remaining time of
    /// events built by [`emit`](Self::emit) are measured from here.
    pub fn register_job(&self, job_id: &str) {
        self.jobs()
            .entry(job_id.to_string())
            .or_default()
            .started_at = Some(Instant::now());
        debug!("Registered job {} for progress", job_id);
    }

    /// Builds an event for `job_id` and publishes it.
    pub fn emit(
        &self,
        job_id: &str,
        progress: f64,
        message: impl Into<String>,
        stage: Stage,
    ) -> ProgressEvent {
        let event = self.build_event(job_id, progress, message.into(), stage);
        self.publish(event.clone());
        event
    }

    /// Builds a terminal event for `job_id` and publishes it.
    pub fn emit_terminal(
        &self,
        job_id: &str,
        progress: f64,
        message: impl Into<String>,
        stage: Stage,
        status: TerminalStatus,
    ) -> ProgressEvent {
        let event = self
            .build_event(job_id, progress, message.into(), stage)
            .with_terminal(status);
        self.publish(event.clone());
        event
    }

    fn build_event(&self, job_id: &str, progress: f64, message: String, stage: Stage) -> ProgressEvent {
        let started_at = self.jobs().get(job_id).and_then(|e| e.started_at);
        let elapsed_ms = started_at
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let mut event = ProgressEvent::new(job_id, progress, message, stage).with_elapsed(elapsed_ms);
        if let Some(remaining) =
            estimate_remaining(event.progress, elapsed_ms, self.inner.config.estimate_after_percent)
        {
            event = event.with_estimated_remaining(remaining);
        }
        event
    }

    /// Caches `event` as the latest state of its job and fans it out to
    /// every current observer of that job.
    ///
    /// A terminal event schedules observer teardown after the configured
    /// delay.
    pub fn publish(&self, event: ProgressEvent) {
        let job_id = event.job_id.clone();
        let terminal = event.is_terminal();
        let ttl = self.inner.config.cache_ttl();

        let delivered = {
            let mut jobs = self.jobs();
            evict_expired(&mut jobs, ttl);

            let entry = jobs.entry(job_id.clone()).or_default();
            let frame = StreamFrame::from_event(event.clone(), false);
            entry
                .observers
                .retain(|_, tx| tx.send(frame.clone()).is_ok());
            entry.cached = Some(CachedEvent {
                event,
                stored_at: Instant::now(),
            });
            if terminal {
                entry.started_at = None;
            }
            entry.observers.len()
        };

        trace!("Published progress for job {} to {} observers", job_id, delivered);

        if terminal {
            self.schedule_teardown(job_id);
        }
    }

    fn schedule_teardown(&self, job_id: String) {
        let delay = self.inner.config.teardown_delay();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let channel = self.clone();
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    channel.close_observers(&job_id);
                });
            }
            Err(_) => self.close_observers(&job_id),
        }
    }

    /// Drops all observers of a job, ending their streams.
    fn close_observers(&self, job_id: &str) {
        let mut jobs = self.jobs();
        if let Some(entry) = jobs.get_mut(job_id) {
            let closed = entry.observers.len();
            entry.observers.clear();
            if entry.is_idle() {
                jobs.remove(job_id);
            }
            debug!("Closed {} progress observers for job {}", closed, job_id);
        }
    }

    /// Registers an observer for `job_id`.
    ///
    /// The first frame is always [`StreamFrame::Connected`]. If an event is
    /// cached for the job it follows immediately, marked as cached. When the
    /// cached event is terminal the subscription ends after the replay.
    pub fn subscribe(&self, job_id: &str) -> Subscription {
        let id = self.inner.next_observer.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(StreamFrame::Connected {
            job_id: job_id.to_string(),
        });

        {
            let mut jobs = self.jobs();
            evict_expired(&mut jobs, self.inner.config.cache_ttl());

            let entry = jobs.entry(job_id.to_string()).or_default();
            let mut finished = false;
            if let Some(cached) = &entry.cached {
                finished = cached.event.is_terminal();
                let _ = tx.send(StreamFrame::from_event(cached.event.clone(), true));
            }
            if finished {
                if entry.is_idle() {
                    jobs.remove(job_id);
                }
            } else {
                entry.observers.insert(id, tx);
            }
        }

        debug!("Observer {} subscribed to job {}", id, job_id);

        Subscription {
            job_id: job_id.to_string(),
            id,
            rx,
            channel: self.clone(),
        }
    }

    /// Removes an observer. Safe to call more than once.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    fn remove_observer(&self, job_id: &str, id: ObserverId) {
        let mut jobs = self.jobs();
        if let Some(entry) = jobs.get_mut(job_id) {
            if entry.observers.remove(&id).is_some() {
                debug!("Observer {} unsubscribed from job {}", id, job_id);
            }
            if entry.is_idle() {
                jobs.remove(job_id);
            }
        }
    }

    /// Number of observers currently registered for `job_id`.
    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.jobs()
            .get(job_id)
            .map(|e| e.observers.len())
            .unwrap_or(0)
    }

    /// The latest unexpired event for `job_id`.
    pub fn cached_event(&self, job_id: &str) -> Option<ProgressEvent> {
        let mut jobs = self.jobs();
        evict_expired(&mut jobs, self.inner.config.cache_ttl());
        jobs.get(job_id)
            .and_then(|e| e.cached.as_ref())
            .map(|c| c.event.clone())
    }

    /// Forgets everything known about a job except its observers.
    pub fn forget_job(&self, job_id: &str) {
        let mut jobs = self.jobs();
        if let Some(entry) = jobs.get_mut(job_id) {
            entry.cached = None;
            entry.started_at = None;
            if entry.is_idle() {
                jobs.remove(job_id);
            }
        }
    }

    /// Number of jobs with any retained state.
    pub fn tracked_jobs(&self) -> usize {
        self.jobs().len()
    }
}

fn evict_expired(jobs: &mut HashMap<String, JobEntry>, ttl: Duration) {
    jobs.retain(|_, entry| {
        if entry
            .cached
            .as_ref()
            .is_some_and(|c| c.stored_at.elapsed() >= ttl)
        {
            entry.cached = None;
        }
        !entry.is_idle()
    });
}

/// Remaining time extrapolated linearly from elapsed time and progress.
fn estimate_remaining(progress: f64, elapsed_ms: u64, after_percent: f64) -> Option<u64> {
    if progress <= after_percent || progress <= 0.0 {
        return None;
    }
    let total = elapsed_ms as f64 / progress * 100.0;
    Some((total - elapsed_ms as f64).max(0.0).round() as u64)
}
