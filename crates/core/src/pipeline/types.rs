//! Types for the generation pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::options::OutputFormat;
use crate::orchestrator::JobSnapshot;

/// Public URL prefix of finished artifacts.
pub const DOWNLOAD_PREFIX: &str = "/downloads";

/// Description of a finished artifact, carried as the result payload of a
/// successful terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub job_id: String,
    pub filename: String,
    pub download_url: String,
    pub output_format: OutputFormat,
    pub entry_count: usize,
    pub size_bytes: u64,
}

impl ArtifactInfo {
    pub fn new(
        job_id: impl Into<String>,
        filename: impl Into<String>,
        output_format: OutputFormat,
        entry_count: usize,
        size_bytes: u64,
    ) -> Self {
        let filename = filename.into();
        Self {
            job_id: job_id.into(),
            download_url: format!("{}/{}", DOWNLOAD_PREFIX, filename),
            filename,
            output_format,
            entry_count,
            size_bytes,
        }
    }
}

/// Name of the artifact of `job_id` produced on `date`.
///
/// A non-zero `copy` is appended as a `-N` suffix, for when the plain name is
/// already taken by an earlier job reusing the same id.
pub fn artifact_filename(
    job_id: &str,
    date: NaiveDate,
    format: OutputFormat,
    copy: u32,
) -> String {
    let date = date.format("%Y-%m-%d");
    if copy == 0 {
        format!("journal-{}-{}.{}", date, job_id, format.extension())
    } else {
        format!("journal-{}-{}-{}.{}", date, job_id, copy, format.extension())
    }
}

/// Current pipeline status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Number of jobs currently running.
    pub running: usize,
    /// Snapshots of the running jobs.
    pub jobs: Vec<JobSnapshot>,
    /// Jobs finished successfully since start.
    pub total_processed: u64,
    /// Jobs failed since start.
    pub total_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            artifact_filename("0123456789abcdef", date, OutputFormat::Pdf, 0),
            "journal-2024-03-09-0123456789abcdef.pdf"
        );
        assert_eq!(
            artifact_filename("abc", date, OutputFormat::Html, 0),
            "journal-2024-03-09-abc.html"
        );
        assert_eq!(
            artifact_filename("abc", date, OutputFormat::Html, 2),
            "journal-2024-03-09-abc-2.html"
        );
    }

    #[test]
    fn test_artifact_info_json() {
        let info = ArtifactInfo::new("job-1", "journal-2024-03-09-job-1.html", OutputFormat::Html, 3, 120);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["downloadUrl"], "/downloads/journal-2024-03-09-job-1.html");
        assert_eq!(json["outputFormat"], "html");
        assert_eq!(json["entryCount"], 3);
    }
}
