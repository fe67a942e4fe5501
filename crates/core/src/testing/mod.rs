//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits
//! (media fetching, document assembly and rendering), allowing whole jobs to
//! run without network access or external programs.
//!
//! # Example
//!
//! ```rust,ignore
//! use diarypress_core::testing::{fixtures, MockAssembler, MockFetcher, MockRenderer};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.add_image("https://img.test/0.png", fixtures::png_bytes(32, 32)).await;
//!
//! let assembler = MockAssembler::new();
//! let renderer = MockRenderer::new(OutputFormat::Pdf);
//! renderer.set_next_error(RenderError::Timeout { timeout_secs: 1 }).await;
//!
//! // Use in GenerationPipeline...
//! ```

mod mock_document;
mod mock_fetcher;

pub use mock_document::{MockAssembler, MockRenderer, RecordedAssembly, RecordedRender};
pub use mock_fetcher::{MockFetcher, RecordedRequest, RequestKind};

/// Test fixtures and helper functions.
pub mod fixtures {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    use crate::journal::{AlbumKind, JournalEntry};

    /// Encode a `width` x `height` gradient as PNG.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .expect("encoding an in-memory PNG cannot fail");
        out.into_inner()
    }

    /// Image locator used by [`entries_with_images`].
    pub fn image_url(index: usize) -> String {
        format!("https://img.test/{}.png", index)
    }

    /// `count` entries with one image each, at [`image_url`]`(i)`.
    pub fn entries_with_images(count: usize) -> Vec<JournalEntry> {
        (0..count)
            .map(|i| {
                JournalEntry::text(day(i), format!("Entry {}", i))
                    .with_album_item(AlbumKind::Image, image_url(i))
            })
            .collect()
    }

    /// `count` text-only entries.
    pub fn text_entries(count: usize) -> Vec<JournalEntry> {
        (0..count)
            .map(|i| JournalEntry::text(day(i), format!("Entry {}", i)))
            .collect()
    }

    /// A small but varied collection: text, tags, a collection, images,
    /// a video and audio.
    pub fn sample_entries() -> Vec<JournalEntry> {
        let mut with_collection = JournalEntry::text("2024-01-03 19:45", "Dinner with friends")
            .with_tags(["friends", "food"]);
        with_collection.collection = Some("Evenings".to_string());

        vec![
            JournalEntry::text("2024-01-01", "New year, new journal"),
            JournalEntry::text("2024-01-02 08:30", "Morning walk")
                .with_album_item(AlbumKind::Image, image_url(0))
                .with_album_item(AlbumKind::Video, "https://img.test/walk.mp4")
                .with_tags(["walk"]),
            with_collection,
            JournalEntry::text("2024-01-04T21:00:00Z", "Voice memo")
                .with_audio("https://audio.test/memo.mp3"),
        ]
    }

    fn day(index: usize) -> String {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let date = base + chrono::Days::new(index as u64);
        date.format("%Y-%m-%d").to_string()
    }
}
