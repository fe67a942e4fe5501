//! Server-Sent Events stream of job progress.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use diarypress_core::StreamFrame;

use crate::metrics::{PROGRESS_FRAMES_SENT, PROGRESS_STREAMS_ACTIVE};
use crate::state::AppState;

/// Keeps the stream gauge in step with stream lifetime.
struct StreamGuard;

impl StreamGuard {
    fn open() -> Self {
        PROGRESS_STREAMS_ACTIVE.inc();
        Self
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        PROGRESS_STREAMS_ACTIVE.dec();
    }
}

fn frame_type(frame: &StreamFrame) -> &'static str {
    match frame {
        StreamFrame::Connected { .. } => "connected",
        StreamFrame::Progress { .. } => "progress",
        StreamFrame::Complete { .. } => "complete",
    }
}

/// GET /api/v1/progress/{job_id}
///
/// The first frame acknowledges the connection, a cached event may follow,
/// and the stream ends after the terminal frame or when the job's observers
/// are torn down. Disconnecting drops the subscription.
pub async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.progress().subscribe(&job_id);
    debug!("Progress stream opened for job {}", job_id);

    let stream = async_stream::stream! {
        let _guard = StreamGuard::open();
        let mut subscription = subscription;
        while let Some(frame) = subscription.recv().await {
            let json = serde_json::to_string(&frame).unwrap_or_default();
            PROGRESS_FRAMES_SENT.with_label_values(&[frame_type(&frame)]).inc();
            yield Ok(Event::default().data(json));
            if frame.is_complete() {
                break;
            }
        }
        debug!("Progress stream closed for job {}", subscription.job_id());
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
