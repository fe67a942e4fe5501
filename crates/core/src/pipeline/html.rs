//! Built-in HTML assembler and renderer.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

use super::error::RenderError;
use super::options::{GenerationOptions, OutputFormat, Theme};
use super::traits::{ContentAssembler, DocumentRenderer};
use crate::journal::{AlbumKind, AudioInfo, JournalEntry};
use crate::media::mime_for_extension;

/// Escapes text for inclusion in HTML element content and attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal HTML listing of entries.
///
/// Entries are written in collection order, one `<article>` each. Text is
/// escaped; images whose locator was replaced by a data URI are embedded.
/// Staged audio is embedded as a data URI as well, other audio plays from
/// its original locator. Both keep a link to the original.
#[derive(Debug, Default, Clone)]
pub struct BasicHtmlAssembler;

impl BasicHtmlAssembler {
    pub fn new() -> Self {
        Self
    }

    fn write_entry(
        out: &mut String,
        entry: &JournalEntry,
        options: &GenerationOptions,
        embedded_audio: Option<&str>,
    ) {
        out.push_str("<article class=\"entry\">\n");
        let _ = writeln!(out, "<h2>{}</h2>", escape_html(&entry.date));

        if let Some(collection) = entry.collection.as_deref().filter(|c| !c.is_empty()) {
            let _ = writeln!(
                out,
                "<p class=\"collection\">{}</p>",
                escape_html(collection)
            );
        }

        if let Some(content) = entry.content.as_deref().filter(|c| !c.is_empty()) {
            for paragraph in content.split("\n\n").filter(|p| !p.trim().is_empty()) {
                let _ = writeln!(
                    out,
                    "<p>{}</p>",
                    escape_html(paragraph.trim()).replace('\n', "<br>")
                );
            }
        }

        if let Some(album) = &entry.album {
            for item in album {
                match item.kind {
                    AlbumKind::Image if options.include_images => {
                        let _ = writeln!(
                            out,
                            "<img src=\"{}\" alt=\"\" loading=\"lazy\">",
                            escape_html(&item.url)
                        );
                    }
                    AlbumKind::Video if options.include_images => {
                        let _ = writeln!(
                            out,
                            "<p class=\"video\"><a href=\"{0}\">{0}</a></p>",
                            escape_html(&item.url)
                        );
                    }
                    _ => {}
                }
            }
        }

        if options.include_audio {
            if let Some(info) = &entry.audio_info {
                let src = embedded_audio.unwrap_or(info.original_url.as_str());
                let _ = writeln!(
                    out,
                    "<audio controls preload=\"none\" src=\"{}\"></audio>",
                    escape_html(src)
                );
                let mut line = format!(
                    "<a href=\"{}\">{}</a> ({})",
                    escape_html(&info.original_url),
                    escape_html(&info.filename),
                    escape_html(&info.size)
                );
                if let Some(format) = &info.format {
                    let _ = write!(line, " {}", escape_html(format));
                }
                let _ = writeln!(out, "<p class=\"audio\">{}</p>", line);
            } else if let Some(audio) = entry.audio.as_deref().filter(|a| !a.is_empty()) {
                let _ = writeln!(
                    out,
                    "<audio controls preload=\"none\" src=\"{0}\"></audio>\n<p class=\"audio\"><a href=\"{0}\">{0}</a></p>",
                    escape_html(audio)
                );
            }
        }

        if options.include_tags {
            if let Some(tags) = entry.tags.as_ref().filter(|t| !t.is_empty()) {
                let joined: Vec<String> =
                    tags.iter().map(|t| format!("#{}", escape_html(t))).collect();
                let _ = writeln!(out, "<p class=\"tags\">{}</p>", joined.join(" "));
            }
        }

        out.push_str("</article>\n");
    }
}

#[async_trait]
impl ContentAssembler for BasicHtmlAssembler {
    fn name(&self) -> &str {
        "basic-html"
    }

    async fn assemble(
        &self,
        entries: &[JournalEntry],
        options: &GenerationOptions,
    ) -> Result<String, RenderError> {
        let (background, foreground) = match options.theme {
            Theme::Light => ("#ffffff", "#222222"),
            Theme::Dark => ("#1e1e1e", "#e6e6e6"),
        };

        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape_html(&options.title));
        let _ = writeln!(
            out,
            "<style>@page {{ size: {}; }} body {{ background: {}; color: {}; }} img {{ max-width: 100%; }}</style>",
            options.page_size.as_str(),
            background,
            foreground
        );
        out.push_str("</head>\n<body>\n");
        let _ = writeln!(out, "<h1>{}</h1>", escape_html(&options.title));
        if let Some(author) = &options.author {
            let _ = writeln!(out, "<p class=\"author\">{}</p>", escape_html(author));
        }

        let embedded = if options.include_audio {
            embed_staged_audio(entries).await
        } else {
            HashMap::new()
        };

        for (index, entry) in entries.iter().enumerate() {
            let audio = embedded.get(&index).map(String::as_str);
            Self::write_entry(&mut out, entry, options, audio);
        }

        out.push_str("</body>\n</html>\n");
        Ok(out)
    }
}

/// Data URIs of staged audio, keyed by entry index.
///
/// An unreadable staged file is skipped; that entry falls back to the
/// original locator.
async fn embed_staged_audio(entries: &[JournalEntry]) -> HashMap<usize, String> {
    let mut embedded = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        let Some(AudioInfo {
            staged_path: Some(path),
            ..
        }) = &entry.audio_info
        else {
            continue;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                embedded.insert(
                    index,
                    format!(
                        "data:{};base64,{}",
                        mime_for_extension(extension),
                        STANDARD.encode(bytes)
                    ),
                );
            }
            Err(e) => warn!("Could not read staged audio {}: {}", path.display(), e),
        }
    }
    embedded
}

/// Writes the assembled document as-is.
#[derive(Debug, Default, Clone)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentRenderer for HtmlRenderer {
    fn name(&self) -> &str {
        "html"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    async fn render(
        &self,
        document: &str,
        _options: &GenerationOptions,
        output: &Path,
    ) -> Result<u64, RenderError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, document.as_bytes()).await?;
        Ok(document.len() as u64)
    }
}
