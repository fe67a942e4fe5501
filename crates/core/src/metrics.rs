//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Generation jobs (started, finished, duration)
//! - Media resolution (outcomes by kind)
//! - Artifact cleanup (runs, files, bytes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs submitted total.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("diarypress_jobs_started_total", "Total generation jobs started").unwrap()
});

/// Jobs finished total by result.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("diarypress_jobs_finished_total", "Total generation jobs finished"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Jobs currently running.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("diarypress_jobs_active", "Generation jobs currently running").unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("diarypress_job_duration_seconds", "Duration of generation jobs")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Media
// =============================================================================

/// Media references resolved total by kind and outcome.
pub static MEDIA_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "diarypress_media_outcomes_total",
            "Media references resolved, by kind and outcome",
        ),
        &["kind", "outcome"], // outcome: "encoded", "fallback", "described", "passthrough"
    )
    .unwrap()
});

/// Media fetch failures by reason.
pub static MEDIA_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("diarypress_media_failures_total", "Media fetch or transcode failures"),
        &["kind", "reason"],
    )
    .unwrap()
});

// =============================================================================
// Cleanup
// =============================================================================

/// Cleanup scans total.
pub static CLEANUP_RUNS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("diarypress_cleanup_runs_total", "Total cleanup scans performed").unwrap()
});

/// Files deleted by cleanup.
pub static CLEANUP_FILES_DELETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "diarypress_cleanup_files_deleted_total",
        "Total files deleted by cleanup",
    )
    .unwrap()
});

/// Bytes freed by cleanup.
pub static CLEANUP_BYTES_FREED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "diarypress_cleanup_bytes_freed_total",
        "Total bytes freed by cleanup",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        Box::new(JOB_DURATION.clone()),
        // Media
        Box::new(MEDIA_OUTCOMES.clone()),
        Box::new(MEDIA_FAILURES.clone()),
        // Cleanup
        Box::new(CLEANUP_RUNS.clone()),
        Box::new(CLEANUP_FILES_DELETED.clone()),
        Box::new(CLEANUP_BYTES_FREED.clone()),
    ]
}
