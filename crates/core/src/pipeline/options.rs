//! Generation options.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media::MediaSelection;

/// Kind of artifact a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A single navigable HTML document.
    #[default]
    Html,
    /// A paginated document produced by an external renderer.
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Page size of paginated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
}

impl PageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::Letter => "Letter",
        }
    }

    /// Lenient parse; anything unknown is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            "letter" => Some(Self::Letter),
            _ => None,
        }
    }
}

/// Color theme of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// Options as submitted by a client. Unknown or missing values fall back
/// to defaults during normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub page_size: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub include_images: Option<bool>,
    #[serde(default)]
    pub include_audio: Option<bool>,
    #[serde(default)]
    pub include_tags: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Normalized generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub output_format: OutputFormat,
    pub page_size: PageSize,
    pub theme: Theme,
    pub include_images: bool,
    pub include_audio: bool,
    pub include_tags: bool,
    pub title: String,
    pub author: Option<String>,
}

const DEFAULT_TITLE: &str = "My Journal";

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            page_size: PageSize::default(),
            theme: Theme::default(),
            include_images: true,
            include_audio: true,
            include_tags: true,
            title: DEFAULT_TITLE.to_string(),
            author: None,
        }
    }
}

impl From<RawOptions> for GenerationOptions {
    fn from(raw: RawOptions) -> Self {
        let defaults = Self::default();
        Self {
            output_format: raw.output_format.unwrap_or(defaults.output_format),
            page_size: raw
                .page_size
                .as_deref()
                .and_then(PageSize::parse)
                .unwrap_or(defaults.page_size),
            theme: raw
                .theme
                .as_deref()
                .and_then(Theme::parse)
                .unwrap_or(defaults.theme),
            include_images: raw.include_images.unwrap_or(true),
            include_audio: raw.include_audio.unwrap_or(true),
            include_tags: raw.include_tags.unwrap_or(true),
            title: raw
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or(defaults.title),
            author: raw
                .author
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        }
    }
}

impl GenerationOptions {
    /// Which media kinds to resolve.
    pub fn media_selection(&self) -> MediaSelection {
        MediaSelection {
            images: self.include_images,
            audio: self.include_audio,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}
