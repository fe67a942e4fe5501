use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use diarypress_core::pipeline::DOWNLOAD_PREFIX;

use super::jobs::JOB_ID_HEADER;
use super::{cleanup, handlers, jobs, middleware::metrics_middleware, progress};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config().server.cors_origins);
    let output_dir = state.config().storage.output_dir.clone();
    let body_limit = state.config().server.max_body_bytes;

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Input checks
        .route("/validate", post(jobs::validate))
        .route("/preview", post(jobs::preview))
        // Jobs
        .route("/jobs", post(jobs::create_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job))
        // Progress stream
        .route("/progress/{job_id}", get(progress::stream_progress))
        // Cleanup
        .route("/cleanup/status", get(cleanup::get_status))
        .route("/cleanup/trigger", post(cleanup::trigger))
        .route("/cleanup/config", put(cleanup::update_config))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics).with_state(state))
        .nest_service(DOWNLOAD_PREFIX, ServeDir::new(output_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
        .expose_headers([JOB_ID_HEADER.clone()])
}
