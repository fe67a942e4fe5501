//! Types for job tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One ordered phase of a job.
///
/// Stage ranges partition `[0, 100]` in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Validate,
    Process,
    Generate,
    Finalize,
}

impl Stage {
    /// All stages in order.
    pub const ALL: [Stage; 5] = [
        Stage::Upload,
        Stage::Validate,
        Stage::Process,
        Stage::Generate,
        Stage::Finalize,
    ];

    /// Progress sub-range `(start, end)` of the stage.
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::Upload => (0.0, 10.0),
            Self::Validate => (10.0, 20.0),
            Self::Process => (20.0, 40.0),
            Self::Generate => (40.0, 80.0),
            Self::Finalize => (80.0, 100.0),
        }
    }

    pub fn floor(self) -> f64 {
        self.range().0
    }

    pub fn ceiling(self) -> f64 {
        self.range().1
    }

    /// Share of the expected job duration spent in this stage.
    pub fn weight(self) -> f64 {
        match self {
            Self::Upload => 0.1,
            Self::Validate => 0.1,
            Self::Process => 0.2,
            Self::Generate => 0.5,
            Self::Finalize => 0.1,
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Uploading file",
            Self::Validate => "Validating data",
            Self::Process => "Processing media",
            Self::Generate => "Generating document",
            Self::Finalize => "Finalizing",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Validate => "validate",
            Self::Process => "process",
            Self::Generate => "generate",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The artifact was produced. Carries an optional result payload.
    Success(Option<serde_json::Value>),
    /// The job failed with a diagnostic.
    Failure(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Point-in-time view of a tracked job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub stage: Stage,
    pub progress: f64,
    pub processed: usize,
    pub total: usize,
    pub stalled: bool,
    pub completed: bool,
    pub elapsed_ms: u64,
}
