//! Journal export model and input validation.
//!
//! A journal export is a JSON array of dated entries. Each entry may carry
//! text, an album of image/video references, an audio reference and tags.
//! Validation runs before any media work starts so that malformed input
//! aborts a job without producing an artifact.

mod types;
mod validate;

pub use types::{AlbumItem, AlbumKind, AudioInfo, JournalEntry};
pub use validate::{
    parse_entries, parse_entry_date, validate_entries, DateRange, JournalStatistics,
    ValidationError, MAX_REPORTED_ERRORS,
};
