//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the server:
//! - HTTP request metrics (latency, counts)
//! - Progress stream connections and frames
//! - Cleanup scheduler and progress registry state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "diarypress_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("diarypress_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "diarypress_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Progress Stream Metrics
// =============================================================================

/// Open progress streams.
pub static PROGRESS_STREAMS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "diarypress_progress_streams_active",
        "Number of open progress event streams",
    )
    .unwrap()
});

/// Progress frames sent by type.
pub static PROGRESS_FRAMES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "diarypress_progress_frames_sent_total",
            "Progress frames sent to observers",
        ),
        &["type"], // "connected", "progress", "complete"
    )
    .unwrap()
});

/// Jobs with cached progress or live observers (collected dynamically).
pub static PROGRESS_JOBS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "diarypress_progress_jobs_tracked",
        "Jobs currently held in the progress registry",
    )
    .unwrap()
});

// =============================================================================
// Cleanup Metrics (collected dynamically)
// =============================================================================

/// Cleanup scheduler state (1 = scheduled, 0 = stopped).
pub static CLEANUP_SCHEDULED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "diarypress_cleanup_scheduled",
        "Whether periodic cleanup is scheduled (1) or stopped (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server_metrics: Vec<Box<dyn Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // Progress
        Box::new(PROGRESS_STREAMS_ACTIVE.clone()),
        Box::new(PROGRESS_FRAMES_SENT.clone()),
        Box::new(PROGRESS_JOBS_TRACKED.clone()),
        // Cleanup
        Box::new(CLEANUP_SCHEDULED.clone()),
    ];

    // Core metrics (jobs, media, cleanup)
    for metric in server_metrics
        .into_iter()
        .chain(diarypress_core::metrics::all_metrics())
    {
        if let Err(e) = registry.register(metric) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the cleanup scheduler and the
/// progress registry at scrape time.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    CLEANUP_SCHEDULED.set(i64::from(state.cleanup().is_scheduled()));
    PROGRESS_JOBS_TRACKED.set(state.progress().tracked_jobs() as i64);
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static PROGRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/progress/[^/]+").unwrap());
static DOWNLOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/downloads/.+").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = PROGRESS_RE.replace_all(&result, "/progress/{job_id}");
    let result = DOWNLOAD_RE.replace_all(&result, "/downloads/{file}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/jobs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_progress_job() {
        assert_eq!(
            normalize_path("/api/v1/progress/my-export"),
            "/api/v1/progress/{job_id}"
        );
    }

    #[test]
    fn test_normalize_path_download() {
        assert_eq!(
            normalize_path("/downloads/journal-2024-03-01-abcd1234.html"),
            "/downloads/{file}"
        );
    }

    #[test]
    fn test_normalize_path_static() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/cleanup/status"), "/api/v1/cleanup/status");
    }

    #[test]
    fn test_encode_includes_core_metrics() {
        diarypress_core::metrics::JOBS_STARTED.inc_by(0);
        let text = encode_metrics().unwrap();
        assert!(text.contains("diarypress_jobs_started_total"));
    }
}
