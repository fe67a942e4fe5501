//! Per-job stage state machine with a time-based progress estimate.
//!
//! A [`JobTracker`] sequences one job through its stages:
//! - **Stage transitions** come from the caller and move progress to a
//!   stage's floor (`next_stage`) or ceiling (`complete_stage`)
//! - **Estimation** runs on a background tick and creeps progress toward,
//!   but never onto, the current stage's ceiling
//! - **Completion** emits exactly one terminal event

mod config;
mod estimator;
mod tracker;
mod types;

pub use config::OrchestratorConfig;
pub use estimator::{
    estimate_progress, expected_stage_duration, stall_nudge, STAGE_CEILING_MARGIN,
};
pub use tracker::JobTracker;
pub use types::{JobOutcome, JobSnapshot, Stage};
