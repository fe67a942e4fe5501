//! Per-job progress publish/subscribe.
//!
//! Producers (the job tracker and the media processor) publish
//! [`ProgressEvent`]s for a job identifier; observers subscribe to a job and
//! receive [`StreamFrame`]s in publish order. The latest event per job is
//! cached for a bounded time so that an observer reconnecting after a
//! transient disconnect is brought up to date immediately.

mod channel;
mod config;
mod types;

pub use channel::{ObserverId, ProgressChannel, Subscription};
pub use config::ProgressConfig;
pub use types::{ProgressEvent, StreamFrame, TerminalStatus};
