//! Progress event and wire frame types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::orchestrator::Stage;

/// Outcome attached to the last event of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalStatus {
    pub success: bool,
    /// Result payload on success (e.g. artifact details).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Diagnostic on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TerminalStatus {
    pub fn succeeded(result: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// A progress report for one job. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: String,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    pub message: String,
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the job was registered.
    pub elapsed_ms: u64,
    /// Estimated milliseconds until completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalStatus>,
}

impl ProgressEvent {
    /// Creates a non-terminal event stamped with the current time.
    pub fn new(
        job_id: impl Into<String>,
        progress: f64,
        message: impl Into<String>,
        stage: Stage,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            progress: progress.clamp(0.0, 100.0),
            message: message.into(),
            stage,
            timestamp: Utc::now(),
            elapsed_ms: 0,
            estimated_remaining_ms: None,
            terminal: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_estimated_remaining(mut self, remaining_ms: u64) -> Self {
        self.estimated_remaining_ms = Some(remaining_ms);
        self
    }

    pub fn with_terminal(mut self, status: TerminalStatus) -> Self {
        self.terminal = Some(status);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

/// A frame delivered to an observer.
///
/// Serialized as a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    /// First frame of every subscription.
    #[serde(rename_all = "camelCase")]
    Connected { job_id: String },

    /// A non-terminal progress event.
    Progress {
        #[serde(flatten)]
        event: ProgressEvent,
        /// Set when the event is a cache replay.
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        cached: bool,
    },

    /// The terminal event. The stream closes shortly after.
    #[serde(rename_all = "camelCase")]
    Complete {
        job_id: String,
        success: bool,
        progress: f64,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        cached: bool,
    },
}

impl StreamFrame {
    /// Wraps an event, choosing the frame kind from its terminal flag.
    pub fn from_event(event: ProgressEvent, cached: bool) -> Self {
        match event.terminal {
            Some(status) => Self::Complete {
                job_id: event.job_id,
                success: status.success,
                progress: event.progress,
                message: event.message,
                result: status.result,
                error: status.error,
                cached,
            },
            None => Self::Progress { event, cached },
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn is_cached(&self) -> bool {
        match self {
            Self::Connected { .. } => false,
            Self::Progress { cached, .. } | Self::Complete { cached, .. } => *cached,
        }
    }

    /// Progress carried by the frame, if any.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Connected { .. } => None,
            Self::Progress { event, .. } => Some(event.progress),
            Self::Complete { progress, .. } => Some(*progress),
        }
    }
}
