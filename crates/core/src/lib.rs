pub mod cleanup;
pub mod config;
pub mod journal;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod size;
pub mod testing;

pub use cleanup::{
    CleanupConfig, CleanupConfigUpdate, CleanupError, CleanupManager, CleanupSnapshot,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, ServerConfig, StorageConfig,
};
pub use journal::{
    parse_entries, validate_entries, JournalEntry, JournalStatistics, ValidationError,
};
pub use media::{HttpFetcher, MediaConfig, MediaError, MediaFetcher, MediaProcessor};
pub use orchestrator::{JobOutcome, JobSnapshot, JobTracker, OrchestratorConfig, Stage};
pub use pipeline::{
    ArtifactInfo, BasicHtmlAssembler, CommandRenderer, ContentAssembler, DocumentRenderer,
    GenerationOptions, GenerationPipeline, HtmlRenderer, OutputFormat, PipelineError,
    PipelineStatus, RawOptions, RenderError, RendererConfig,
};
pub use progress::{ProgressChannel, ProgressConfig, ProgressEvent, StreamFrame, Subscription};
pub use size::format_size;
