//! Types for the cleanup module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::CleanupConfig;
use crate::size::format_size;

/// Cumulative and most-recent-run counters.
///
/// Totals only grow; the `last_run_*` fields are overwritten by each scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    pub total_files_deleted: u64,
    pub total_bytes_freed: u64,
    pub last_run_files: u64,
    pub last_run_bytes: u64,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Outcome of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub files_deleted: u64,
    pub bytes_freed: u64,
    pub duration_ms: u64,
}

/// Point-in-time view of a cleanup manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSnapshot {
    pub enabled: bool,
    /// Whether the periodic scan is scheduled.
    pub scheduled: bool,
    /// Whether a scan is in progress right now.
    pub is_running: bool,
    pub last_cleanup_time: Option<DateTime<Utc>>,
    pub total_files_deleted: u64,
    pub total_bytes_freed: u64,
    pub total_size_freed: String,
    pub last_run_files: u64,
    pub last_run_bytes: u64,
    pub last_run_size: String,
    pub config: CleanupConfig,
}

impl CleanupSnapshot {
    pub fn new(
        stats: &CleanupStats,
        config: CleanupConfig,
        scheduled: bool,
        is_running: bool,
    ) -> Self {
        Self {
            enabled: config.enabled,
            scheduled,
            is_running,
            last_cleanup_time: stats.last_run_at,
            total_files_deleted: stats.total_files_deleted,
            total_bytes_freed: stats.total_bytes_freed,
            total_size_freed: format_size(stats.total_bytes_freed),
            last_run_files: stats.last_run_files,
            last_run_bytes: stats.last_run_bytes,
            last_run_size: format_size(stats.last_run_bytes),
            config,
        }
    }
}
