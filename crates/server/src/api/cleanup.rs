//! Artifact cleanup control endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use diarypress_core::{CleanupConfigUpdate, CleanupSnapshot};

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub message: String,
}

/// Current statistics and effective configuration
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<CleanupSnapshot> {
    Json(state.cleanup().stats())
}

/// Start an out-of-band scan and return immediately
pub async fn trigger(State(state): State<Arc<AppState>>) -> (StatusCode, Json<TriggerResponse>) {
    let cleanup = state.cleanup().clone();
    tokio::spawn(async move {
        if cleanup.clean_now().await.is_none() {
            info!("Triggered cleanup skipped: a scan is already running");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            message: "Cleanup started".to_string(),
        }),
    )
}

/// Merge a partial configuration update. Absent fields keep their value.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<CleanupConfigUpdate>,
) -> Result<Json<CleanupSnapshot>, ApiError> {
    let snapshot = state.cleanup().update_config(&update)?;
    Ok(Json(snapshot))
}
