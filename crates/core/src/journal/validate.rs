//! Structural validation of journal exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::types::{AlbumKind, JournalEntry};

/// At most this many per-entry problems are reported back.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Number of tags included in the statistics.
const MAX_REPORTED_TAGS: usize = 20;

/// Input errors. A job that hits one of these produces no artifact.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// The export is not a JSON array.
    #[error("journal data must be an array, found {found}")]
    NotAnArray { found: String },

    /// The export has no entries.
    #[error("journal data must not be empty")]
    Empty,

    /// One or more entries are malformed.
    #[error("found {count} invalid entries")]
    InvalidEntries {
        count: usize,
        /// The first few problems, one line per entry.
        errors: Vec<String>,
    },
}

impl ValidationError {
    /// Per-entry problem descriptions, if any.
    pub fn details(&self) -> &[String] {
        match self {
            Self::InvalidEntries { errors, .. } => errors,
            _ => &[],
        }
    }

    fn from_errors(errors: Vec<String>) -> Self {
        Self::InvalidEntries {
            count: errors.len(),
            errors: errors.into_iter().take(MAX_REPORTED_ERRORS).collect(),
        }
    }
}

/// Earliest and latest entry date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
}

/// Summary of a valid journal export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalStatistics {
    pub total_entries: usize,
    pub with_images: usize,
    pub with_videos: usize,
    pub with_audio: usize,
    pub with_tags: usize,
    pub with_collections: usize,
    pub date_range: Option<DateRange>,
    pub unique_collections: usize,
    pub unique_tags: usize,
    pub collections: Vec<String>,
    /// First tags in sorted order.
    pub tags: Vec<String>,
}

/// Parses an entry date.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD`, and `YYYY-MM-DD HH:MM[:SS]`
/// with either a space or `T` separator.
pub fn parse_entry_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Converts raw JSON into journal entries.
///
/// Entries that cannot be read are reported by position rather than failing
/// on the first one.
pub fn parse_entries(value: &serde_json::Value) -> Result<Vec<JournalEntry>, ValidationError> {
    let items = value.as_array().ok_or_else(|| ValidationError::NotAnArray {
        found: json_type_name(value).to_string(),
    })?;

    if items.is_empty() {
        return Err(ValidationError::Empty);
    }

    let mut entries = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match serde_json::from_value::<JournalEntry>(item.clone()) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(format!("entry {}: {}", idx + 1, e)),
        }
    }

    if errors.is_empty() {
        Ok(entries)
    } else {
        Err(ValidationError::from_errors(errors))
    }
}

/// Validates journal entries and collects statistics.
pub fn validate_entries(entries: &[JournalEntry]) -> Result<JournalStatistics, ValidationError> {
    if entries.is_empty() {
        return Err(ValidationError::Empty);
    }

    let mut errors = Vec::new();
    let mut stats = JournalStatistics {
        total_entries: entries.len(),
        with_images: 0,
        with_videos: 0,
        with_audio: 0,
        with_tags: 0,
        with_collections: 0,
        date_range: None,
        unique_collections: 0,
        unique_tags: 0,
        collections: Vec::new(),
        tags: Vec::new(),
    };
    let mut collections = BTreeSet::new();
    let mut tags = BTreeSet::new();
    let mut earliest: Option<NaiveDateTime> = None;
    let mut latest: Option<NaiveDateTime> = None;

    for (idx, entry) in entries.iter().enumerate() {
        let n = idx + 1;

        if entry.date.trim().is_empty() {
            errors.push(format!("entry {}: missing date", n));
            continue;
        }

        if !entry.has_payload() {
            errors.push(format!(
                "entry {}: must contain at least one of content, album or audio",
                n
            ));
            continue;
        }

        let Some(date) = parse_entry_date(&entry.date) else {
            errors.push(format!("entry {}: invalid date '{}'", n, entry.date));
            continue;
        };
        earliest = Some(earliest.map_or(date, |e| e.min(date)));
        latest = Some(latest.map_or(date, |l| l.max(date)));

        if let Some(album) = &entry.album {
            if album.iter().any(|i| i.kind == AlbumKind::Image) {
                stats.with_images += 1;
            }
            if album.iter().any(|i| i.kind == AlbumKind::Video) {
                stats.with_videos += 1;
            }
            for (item_idx, item) in album.iter().enumerate() {
                if item.url.trim().is_empty() {
                    errors.push(format!("entry {}: album[{}] is missing a url", n, item_idx));
                } else if item.kind == AlbumKind::Unknown {
                    errors.push(format!(
                        "entry {}: album[{}] type must be 'image' or 'video'",
                        n, item_idx
                    ));
                }
            }
        }

        if let Some(entry_tags) = &entry.tags {
            stats.with_tags += 1;
            tags.extend(entry_tags.iter().cloned());
        }

        if entry.audio.as_deref().is_some_and(|a| !a.is_empty()) {
            stats.with_audio += 1;
        }

        if let Some(collection) = &entry.collection {
            stats.with_collections += 1;
            collections.insert(collection.clone());
        }
    }

    if !errors.is_empty() {
        return Err(ValidationError::from_errors(errors));
    }

    stats.date_range = earliest.zip(latest).map(|(earliest, latest)| DateRange { earliest, latest });
    stats.unique_collections = collections.len();
    stats.unique_tags = tags.len();
    stats.collections = collections.into_iter().collect();
    stats.tags = tags.into_iter().take(MAX_REPORTED_TAGS).collect();

    Ok(stats)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
