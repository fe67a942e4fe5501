//! Audio metadata derivation.

use reqwest::Url;

use crate::journal::AudioInfo;
use crate::size::format_size;

use super::types::AudioProbe;

/// Extensions accepted from a locator's path.
const KNOWN_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "wav", "ogg", "aac"];

const DEFAULT_EXTENSION: &str = "mp3";

const UNKNOWN_SIZE: &str = "unknown size";
const UNKNOWN_FORMAT: &str = "audio file";
const UNKNOWN_FILENAME: &str = "unknown-audio";

fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// File extension (without dot) for an audio content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match mime_essence(content_type).as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" => Some("m4a"),
        "audio/wav" | "audio/wave" => Some("wav"),
        "audio/ogg" => Some("ogg"),
        "audio/aac" => Some("aac"),
        "audio/webm" => Some("webm"),
        _ => None,
    }
}

/// Content type for a staged audio file's extension.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "webm" => "audio/webm",
        _ => "audio/mpeg",
    }
}

/// Normalized format label from the content type, falling back to the
/// extension.
pub fn format_label(content_type: &str, extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let from_ext = match ext.as_str() {
        "mp3" => Some("MP3"),
        "m4a" => Some("M4A"),
        "wav" => Some("WAV"),
        "ogg" => Some("OGG"),
        "aac" => Some("AAC"),
        "webm" => Some("WebM"),
        _ => None,
    };
    extension_for(content_type)
        .and_then(|e| format_label("", e))
        .or(from_ext)
}

/// Last non-empty path segment of the locator.
fn path_filename(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn path_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
}

/// Builds display metadata from a successful probe.
pub fn describe_audio(raw_url: &str, probe: &AudioProbe) -> AudioInfo {
    let Ok(url) = Url::parse(raw_url) else {
        return fallback_audio_info(raw_url);
    };
    let content_type = probe.content_type.as_deref().unwrap_or_default();
    let filename = path_filename(&url);

    let extension = extension_for(content_type)
        .map(str::to_string)
        .or_else(|| filename.as_deref().and_then(path_extension))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let filename = filename.unwrap_or_else(|| format!("audio.{}", extension));
    let size_bytes = probe.content_length;

    AudioInfo {
        original_url: raw_url.to_string(),
        filename,
        size: format_size(size_bytes.unwrap_or(0)),
        size_bytes,
        duration: None,
        format: Some(
            format_label(content_type, &extension)
                .unwrap_or(UNKNOWN_FORMAT)
                .to_string(),
        ),
        staged_path: None,
    }
}

/// Best-effort metadata when the probe failed.
pub fn fallback_audio_info(raw_url: &str) -> AudioInfo {
    let filename = Url::parse(raw_url)
        .ok()
        .and_then(|u| path_filename(&u))
        .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());

    AudioInfo {
        original_url: raw_url.to_string(),
        filename,
        size: UNKNOWN_SIZE.to_string(),
        size_bytes: None,
        duration: None,
        format: Some(UNKNOWN_FORMAT.to_string()),
        staged_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for("Audio/MP4; charset=binary"), Some("m4a"));
        assert_eq!(extension_for("audio/wave"), Some("wav"));
        assert_eq!(extension_for("audio/webm"), Some("webm"));
        assert_eq!(extension_for("application/octet-stream"), None);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("m4a"), "audio/mp4");
        assert_eq!(mime_for_extension(".WAV"), "audio/wav");
        assert_eq!(mime_for_extension("mp3"), "audio/mpeg");
        assert_eq!(mime_for_extension("bin"), "audio/mpeg");
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label("audio/mpeg", ""), Some("MP3"));
        assert_eq!(format_label("", ".aac"), Some("AAC"));
        assert_eq!(format_label("audio/webm", "mp3"), Some("WebM"));
        assert_eq!(format_label("text/html", "flac"), None);
    }

    #[test]
    fn test_describe_audio_from_content_type() {
        let probe = AudioProbe {
            content_length: Some(3 * 1024 * 1024),
            content_type: Some("audio/mp4".to_string()),
        };
        let info = describe_audio("https://cdn.example.com/voice/note.bin", &probe);
        assert_eq!(info.filename, "note.bin");
        assert_eq!(info.size, "3.00 MB");
        assert_eq!(info.size_bytes, Some(3 * 1024 * 1024));
        assert_eq!(info.format.as_deref(), Some("M4A"));
    }

    #[test]
    fn test_describe_audio_from_extension() {
        let probe = AudioProbe {
            content_length: None,
            content_type: Some("application/octet-stream".to_string()),
        };
        let info = describe_audio("https://example.com/a/memo.OGG", &probe);
        assert_eq!(info.format.as_deref(), Some("OGG"));
        assert_eq!(info.size, "0 B");
    }

    #[test]
    fn test_describe_audio_defaults_to_mp3() {
        let info = describe_audio("https://example.com/", &AudioProbe::default());
        assert_eq!(info.filename, "audio.mp3");
        assert_eq!(info.format.as_deref(), Some("MP3"));
    }

    #[test]
    fn test_fallback_audio_info() {
        let info = fallback_audio_info("https://example.com/rec/clip.m4a");
        assert_eq!(info.filename, "clip.m4a");
        assert_eq!(info.size, "unknown size");
        assert_eq!(info.format.as_deref(), Some("audio file"));

        let info = fallback_audio_info("not a url");
        assert_eq!(info.filename, "unknown-audio");
        assert_eq!(info.original_url, "not a url");
    }
}
