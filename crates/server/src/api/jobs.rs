//! Job submission, status and input validation endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use diarypress_core::{
    parse_entries, validate_entries, GenerationOptions, JobSnapshot, JournalEntry,
    JournalStatistics, PipelineStatus, RawOptions,
};

use super::error::ApiError;
use crate::state::AppState;

/// Header carrying the identifier of a submitted job.
pub static JOB_ID_HEADER: HeaderName = HeaderName::from_static("x-job-id");

/// Number of entries returned by the preview endpoint.
const PREVIEW_LIMIT: usize = 10;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a generation job
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Raw journal export; must be a JSON array of entries
    pub entries: serde_json::Value,
    #[serde(default)]
    pub options: Option<RawOptions>,
    /// Caller-chosen job id, generated when absent
    #[serde(default, alias = "jobId")]
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
    pub progress_url: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub statistics: JournalStatistics,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub preview: Vec<JournalEntry>,
    pub total: usize,
    pub statistics: JournalStatistics,
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a generation job. Responds before any processing starts so the
/// caller can subscribe to progress first.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, HeaderMap, Json<CreateJobResponse>), ApiError> {
    let entries = parse_entries(&body.entries)?;
    let options = GenerationOptions::from(body.options.unwrap_or_default());

    let job_id = state
        .pipeline()
        .submit(entries, options, body.job_id)
        .await?;
    info!("Accepted generation job {}", job_id);

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&job_id) {
        headers.insert(JOB_ID_HEADER.clone(), value);
    }

    Ok((
        StatusCode::ACCEPTED,
        headers,
        Json(CreateJobResponse {
            progress_url: format!("/api/v1/progress/{}", job_id),
            job_id,
        }),
    ))
}

/// Pipeline status with a snapshot of every running job
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.pipeline().status().await)
}

/// Snapshot of a single running job
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .pipeline()
        .job(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, format!("Job not running: {}", job_id))
        })
}

/// Validate an export without generating anything
pub async fn validate(
    Json(data): Json<serde_json::Value>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let entries = parse_entries(&data)?;
    let statistics = validate_entries(&entries)?;
    debug!("Validated {} entries", statistics.total_entries);

    Ok(Json(ValidateResponse {
        valid: true,
        statistics,
    }))
}

/// Validate an export and return its first entries
pub async fn preview(
    Json(data): Json<serde_json::Value>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let entries = parse_entries(&data)?;
    let statistics = validate_entries(&entries)?;
    let total = entries.len();

    Ok(Json(PreviewResponse {
        preview: entries.into_iter().take(PREVIEW_LIMIT).collect(),
        total,
        statistics,
    }))
}
