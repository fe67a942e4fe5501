//! Media resolution for journal entries.
//!
//! Every image and audio reference of a job is resolved with bounded
//! parallelism: images are fetched and transcoded into a self-contained
//! JPEG data URI, audio is probed for descriptive metadata. A failing asset
//! never fails the job; it degrades to its original locator instead.
//!
//! Two limits apply at once:
//! - per job, references are processed in fixed-size batches
//! - across jobs, a shared semaphore bounds concurrent network operations

mod audio;
mod config;
mod error;
mod http;
mod processor;
mod traits;
mod transcode;
mod types;

pub use audio::{
    describe_audio, extension_for, fallback_audio_info, format_label, mime_for_extension,
};
pub use config::MediaConfig;
pub use error::MediaError;
pub use http::HttpFetcher;
pub use processor::MediaProcessor;
pub use traits::MediaFetcher;
pub use transcode::{to_data_uri, transcode_image};
pub use types::{
    collect_references, AudioProbe, MediaKind, MediaOutcome, MediaReference, MediaSelection,
    ProcessedMedia, ResolvedMedia,
};
