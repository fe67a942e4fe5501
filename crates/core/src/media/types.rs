//! Types for media resolution.

use serde::{Deserialize, Serialize};

use crate::journal::{AlbumKind, AudioInfo, JournalEntry};

/// Kind of a media reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// An unresolved pointer to remote media inside an entry collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaReference {
    pub entry_index: usize,
    /// Position inside the entry's album; `None` for the entry's audio.
    pub sub_index: Option<usize>,
    pub kind: MediaKind,
    pub url: String,
}

/// What a reference resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MediaOutcome {
    /// The image was transcoded; the data URI replaces the locator.
    Encoded { data_uri: String },
    /// The image could not be resolved; the original locator is kept.
    Original { reason: String },
    /// Audio metadata, possibly with a staged local copy.
    Audio { info: AudioInfo },
    /// Left untouched without network access.
    PassThrough,
}

impl MediaOutcome {
    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Encoded { .. } => "encoded",
            Self::Original { .. } => "fallback",
            Self::Audio { .. } => "described",
            Self::PassThrough => "passthrough",
        }
    }
}

/// A reference together with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub reference: MediaReference,
    pub outcome: MediaOutcome,
}

/// Which kinds are resolved. Excluded kinds pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSelection {
    pub images: bool,
    pub audio: bool,
}

impl Default for MediaSelection {
    fn default() -> Self {
        Self {
            images: true,
            audio: true,
        }
    }
}

impl MediaSelection {
    pub fn includes(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.images,
            MediaKind::Audio => self.audio,
            MediaKind::Video => false,
        }
    }
}

/// Result of resolving the media of one job.
#[derive(Debug, Clone)]
pub struct ProcessedMedia {
    /// Entries with outcomes substituted in.
    pub entries: Vec<JournalEntry>,
    /// One outcome per reference, in collection order.
    pub resolved: Vec<ResolvedMedia>,
}

impl ProcessedMedia {
    /// Number of outcomes with the given label.
    pub fn count(&self, label: &str) -> usize {
        self.resolved
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }
}

/// Response headers of an audio metadata probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioProbe {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// Collects every media reference in a single pass over the entries.
///
/// Album items of an unknown kind and empty locators are not references.
pub fn collect_references(entries: &[JournalEntry]) -> Vec<MediaReference> {
    let mut refs = Vec::new();
    for (entry_index, entry) in entries.iter().enumerate() {
        if let Some(album) = &entry.album {
            for (sub_index, item) in album.iter().enumerate() {
                let kind = match item.kind {
                    AlbumKind::Image => MediaKind::Image,
                    AlbumKind::Video => MediaKind::Video,
                    AlbumKind::Unknown => continue,
                };
                if item.url.is_empty() {
                    continue;
                }
                refs.push(MediaReference {
                    entry_index,
                    sub_index: Some(sub_index),
                    kind,
                    url: item.url.clone(),
                });
            }
        }

        if let Some(audio) = entry.audio.as_deref().filter(|a| !a.is_empty()) {
            refs.push(MediaReference {
                entry_index,
                sub_index: None,
                kind: MediaKind::Audio,
                url: audio.to_string(),
            });
        }
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_references() {
        let entries = vec![
            JournalEntry::text("2024-01-01", "text only"),
            JournalEntry::text("2024-01-02", "album")
                .with_album_item(AlbumKind::Image, "https://a/1.png")
                .with_album_item(AlbumKind::Video, "https://a/2.mp4")
                .with_album_item(AlbumKind::Unknown, "https://a/3.gif")
                .with_audio("https://a/4.mp3"),
        ];

        let refs = collect_references(&entries);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].kind, MediaKind::Image);
        assert_eq!(refs[0].entry_index, 1);
        assert_eq!(refs[0].sub_index, Some(0));
        assert_eq!(refs[1].kind, MediaKind::Video);
        assert_eq!(refs[1].sub_index, Some(1));
        assert_eq!(refs[2].kind, MediaKind::Audio);
        assert_eq!(refs[2].sub_index, None);
    }

    #[test]
    fn test_selection() {
        let selection = MediaSelection {
            images: false,
            audio: true,
        };
        assert!(!selection.includes(MediaKind::Image));
        assert!(selection.includes(MediaKind::Audio));
        assert!(!MediaSelection::default().includes(MediaKind::Video));
    }

    #[test]
    fn test_outcome_json() {
        let outcome = MediaOutcome::Original {
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "original");
        assert_eq!(json["reason"], "timeout");
    }
}
