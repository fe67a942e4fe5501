//! Journal entry types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One dated record of the journal export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Entry date as found in the export.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Images and videos attached to the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<Vec<AlbumItem>>,
    /// Audio locator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Resolved audio metadata, filled in by media processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_info: Option<AudioInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl JournalEntry {
    /// Creates a text-only entry.
    pub fn text(date: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            content: Some(content.into()),
            collection: None,
            album: None,
            audio: None,
            audio_info: None,
            tags: None,
        }
    }

    /// Adds an album item.
    pub fn with_album_item(mut self, kind: AlbumKind, url: impl Into<String>) -> Self {
        self.album.get_or_insert_with(Vec::new).push(AlbumItem {
            kind,
            url: url.into(),
        });
        self
    }

    /// Sets the audio locator.
    pub fn with_audio(mut self, url: impl Into<String>) -> Self {
        self.audio = Some(url.into());
        self
    }

    /// Sets the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the entry has any text, album or audio.
    pub fn has_payload(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
            || self.album.is_some()
            || self.audio.as_deref().is_some_and(|a| !a.is_empty())
    }
}

/// An album attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumItem {
    #[serde(rename = "type")]
    pub kind: AlbumKind,
    pub url: String,
}

/// Kind of an album attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumKind {
    Image,
    Video,
    /// Anything else found in the export; rejected by validation.
    #[serde(other)]
    Unknown,
}

/// Descriptive metadata for an entry's audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    /// The locator the metadata was derived from.
    pub original_url: String,
    /// Display filename.
    pub filename: String,
    /// Human readable size, e.g. "3.2 MB".
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Normalized format label, e.g. "MP3".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Local copy of the audio when it was small enough to stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_export_entry() {
        let json = r#"{
            "date": "2023-05-01 08:30",
            "content": "Morning walk",
            "album": [
                {"type": "image", "url": "https://example.com/a.png"},
                {"type": "video", "url": "https://example.com/b.mp4"}
            ],
            "audio": "https://example.com/c.mp3",
            "tags": ["walk"]
        }"#;
        let entry: JournalEntry = serde_json::from_str(json).unwrap();
        let album = entry.album.as_ref().unwrap();
        assert_eq!(album.len(), 2);
        assert_eq!(album[0].kind, AlbumKind::Image);
        assert_eq!(album[1].kind, AlbumKind::Video);
        assert_eq!(entry.audio.as_deref(), Some("https://example.com/c.mp3"));
        assert!(entry.audio_info.is_none());
    }

    #[test]
    fn test_unknown_album_kind() {
        let item: AlbumItem =
            serde_json::from_str(r#"{"type": "sticker", "url": "x"}"#).unwrap();
        assert_eq!(item.kind, AlbumKind::Unknown);
    }

    #[test]
    fn test_audio_info_uses_camel_case() {
        let info = AudioInfo {
            original_url: "https://example.com/a.mp3".to_string(),
            filename: "a.mp3".to_string(),
            size: "1 KB".to_string(),
            size_bytes: Some(1024),
            duration: None,
            format: Some("MP3".to_string()),
            staged_path: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["originalUrl"], "https://example.com/a.mp3");
        assert_eq!(json["sizeBytes"], 1024);
        assert!(json.get("stagedPath").is_none());
    }

    #[test]
    fn test_has_payload() {
        assert!(JournalEntry::text("2024-01-01", "hi").has_payload());
        let mut empty = JournalEntry::text("2024-01-01", "");
        assert!(!empty.has_payload());
        empty = empty.with_audio("https://example.com/a.mp3");
        assert!(empty.has_payload());
    }
}
