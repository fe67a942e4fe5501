//! Cleanup manager implementation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::size::format_size;

use super::config::{CleanupConfig, CleanupConfigUpdate};
use super::error::CleanupError;
use super::types::{CleanupReport, CleanupSnapshot, CleanupStats};

struct Inner {
    config: Mutex<CleanupConfig>,
    stats: Mutex<CleanupStats>,
    /// Set while a scan is in progress.
    scanning: AtomicBool,
    /// Set while the periodic scan is scheduled.
    scheduled: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

/// Clears the scan flag when a scan ends, however it ends.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reclaims disk space by deleting old entries under the configured
/// directory roots.
///
/// A scan removes every file whose modification time is at least
/// `max_age` ago, recursing into equally old directories and removing them
/// once empty. Per-entry failures are logged and skipped. At most one scan
/// runs at a time; a scan requested while another is in progress is
/// skipped.
#[derive(Clone)]
pub struct CleanupManager {
    inner: Arc<Inner>,
}

impl Inner {
    fn config(&self) -> MutexGuard<'_, CleanupConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats(&self) -> MutexGuard<'_, CleanupStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn perform_cleanup(&self) -> Option<CleanupReport> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            info!("Cleanup already in progress, skipping this run");
            return None;
        }
        let _guard = ScanGuard(&self.scanning);

        let config = self.config().clone();
        let started = Instant::now();
        let now = SystemTime::now();
        let mut files_deleted = 0;
        let mut bytes_freed = 0;

        debug!(
            "Starting cleanup of {} targets (max age {}s)",
            config.targets.len(),
            config.max_age_secs
        );

        for target in &config.targets {
            match tokio::fs::metadata(target).await {
                Ok(meta) if meta.is_dir() => {
                    let (files, bytes) = clean_directory(target, config.max_age(), now).await;
                    files_deleted += files;
                    bytes_freed += bytes;
                }
                Ok(_) => warn!("Cleanup target {} is not a directory", target.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Cleanup target {} does not exist", target.display());
                }
                Err(e) => warn!("Cannot read cleanup target {}: {}", target.display(), e),
            }
        }

        let report = CleanupReport {
            files_deleted,
            bytes_freed,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        {
            let mut stats = self.stats();
            stats.total_files_deleted += files_deleted;
            stats.total_bytes_freed += bytes_freed;
            stats.last_run_files = files_deleted;
            stats.last_run_bytes = bytes_freed;
            stats.last_run_at = Some(Utc::now());
        }

        metrics::CLEANUP_RUNS.inc();
        metrics::CLEANUP_FILES_DELETED.inc_by(files_deleted);
        metrics::CLEANUP_BYTES_FREED.inc_by(bytes_freed);

        if files_deleted > 0 {
            info!(
                "Cleanup finished: deleted {} files, freed {} in {}ms",
                files_deleted,
                format_size(bytes_freed),
                report.duration_ms
            );
        } else {
            debug!(
                "Cleanup finished: nothing to delete ({}ms)",
                report.duration_ms
            );
        }

        Some(report)
    }
}

/// Deletes entries of `dir` at least `max_age` old. Returns files deleted
/// and bytes freed.
fn clean_directory(dir: &Path, max_age: Duration, now: SystemTime) -> BoxFuture<'_, (u64, u64)> {
    Box::pin(async move {
        let mut files_deleted = 0;
        let mut bytes_freed = 0;

        let mut reader = match tokio::fs::read_dir(dir).await {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Failed to read directory {}: {}", dir.display(), e);
                return (0, 0);
            }
        };

        loop {
            let entry = match reader.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to list directory {}: {}", dir.display(), e);
                    break;
                }
            };
            let path = entry.path();

            // Entries may vanish between listing and inspection.
            let meta = match tokio::fs::symlink_metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            if age < max_age {
                continue;
            }

            if meta.is_dir() {
                let (files, bytes) = clean_directory(&path, max_age, now).await;
                files_deleted += files;
                bytes_freed += bytes;

                match tokio::fs::remove_dir(&path).await {
                    Ok(()) => debug!("Removed empty directory {}", path.display()),
                    Err(_) => debug!("Keeping non-empty directory {}", path.display()),
                }
            } else {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        files_deleted += 1;
                        bytes_freed += meta.len();
                        debug!(
                            "Deleted {} (age {}min, {})",
                            path.display(),
                            age.as_secs() / 60,
                            format_size(meta.len())
                        );
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        debug!("{} vanished before deletion", path.display());
                    }
                    Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
                }
            }
        }

        (files_deleted, bytes_freed)
    })
}

impl CleanupManager {
    pub fn new(config: CleanupConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(Inner {
                config: Mutex::new(config),
                stats: Mutex::new(CleanupStats::default()),
                scanning: AtomicBool::new(false),
                scheduled: AtomicBool::new(false),
                shutdown_tx,
            }),
        }
    }

    /// Schedules periodic scans, the first one immediately.
    ///
    /// Does nothing when cleanup is disabled or already scheduled. Must be
    /// called within a Tokio runtime.
    pub fn start(&self) {
        let config = self.inner.config().clone();
        if !config.enabled {
            info!("Automatic cleanup is disabled");
            return;
        }
        if self.inner.scheduled.swap(true, Ordering::SeqCst) {
            warn!("Cleanup already scheduled");
            return;
        }

        info!(
            "Starting automatic cleanup: targets={:?}, max_age={}s, interval={}s",
            config.targets, config.max_age_secs, config.interval_secs
        );
        self.spawn_scan_loop(config.interval());
    }

    /// Cancels the periodic scan. Idempotent; a scan in progress finishes.
    pub fn stop(&self) {
        if !self.inner.scheduled.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.shutdown_tx.send(());
        info!("Automatic cleanup stopped");
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.scheduled.load(Ordering::SeqCst)
    }

    fn spawn_scan_loop(&self, period: Duration) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Cleanup loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else {
                            break;
                        };
                        inner.perform_cleanup().await;
                    }
                }
            }
        });
    }

    /// Runs one scan now. Returns `None` if a scan was already in progress.
    pub async fn perform_cleanup(&self) -> Option<CleanupReport> {
        self.inner.perform_cleanup().await
    }

    /// Out-of-band scan, subject to the same single-scan rule.
    pub async fn clean_now(&self) -> Option<CleanupReport> {
        info!("Manual cleanup triggered");
        self.inner.perform_cleanup().await
    }

    /// Deletes a single file and counts it in the cumulative totals.
    /// Returns the bytes freed.
    pub async fn clean_file(&self, path: &Path) -> Result<u64, CleanupError> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CleanupError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            return Err(CleanupError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        tokio::fs::remove_file(path).await?;

        let size = meta.len();
        {
            let mut stats = self.inner.stats();
            stats.total_files_deleted += 1;
            stats.total_bytes_freed += size;
        }
        metrics::CLEANUP_FILES_DELETED.inc();
        metrics::CLEANUP_BYTES_FREED.inc_by(size);

        info!("Deleted {} ({})", path.display(), format_size(size));
        Ok(size)
    }

    /// Merges `update` into the configuration.
    ///
    /// Toggling `enabled` starts or stops the periodic scan; a new interval
    /// while scheduled replaces the timer. Other changes apply from the
    /// next scan.
    pub fn update_config(
        &self,
        update: &CleanupConfigUpdate,
    ) -> Result<CleanupSnapshot, CleanupError> {
        if update.interval_secs == Some(0) {
            return Err(CleanupError::InvalidConfig(
                "interval_secs cannot be 0".to_string(),
            ));
        }

        let (was_enabled, interval_changed, now_enabled) = {
            let mut config = self.inner.config();
            let merged = update.apply(&config);
            let result = (
                config.enabled,
                merged.interval_secs != config.interval_secs,
                merged.enabled,
            );
            *config = merged;
            result
        };

        if was_enabled != now_enabled {
            self.stop();
            if now_enabled {
                self.start();
            }
        } else if now_enabled && interval_changed && self.is_scheduled() {
            self.stop();
            self.start();
        }

        info!("Cleanup configuration updated: {:?}", self.config());
        Ok(self.stats())
    }

    pub fn config(&self) -> CleanupConfig {
        self.inner.config().clone()
    }

    pub fn stats(&self) -> CleanupSnapshot {
        let stats = self.inner.stats().clone();
        CleanupSnapshot::new(
            &stats,
            self.config(),
            self.is_scheduled(),
            self.inner.scanning.load(Ordering::SeqCst),
        )
    }
}
