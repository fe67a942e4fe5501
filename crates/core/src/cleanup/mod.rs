//! Age-based reclamation of job artifacts and working files.
//!
//! The [`CleanupManager`] owns its periodic scan: `start` schedules it and
//! `stop` cancels it. Statistics only grow, except for the most recent run,
//! which each scan overwrites.

mod config;
mod error;
mod manager;
mod types;

pub use config::{CleanupConfig, CleanupConfigUpdate};
pub use error::CleanupError;
pub use manager::CleanupManager;
pub use types::{CleanupReport, CleanupSnapshot, CleanupStats};
