//! Document generation pipeline.
//!
//! A job moves through validate, process, generate and finalize. Document
//! assembly and rendering are collaborators behind the [`ContentAssembler`]
//! and [`DocumentRenderer`] traits; the pipeline owns sequencing, failure
//! handling and artifact placement.

mod command;
mod config;
mod error;
mod html;
mod options;
mod runner;
mod traits;
mod types;

pub use command::CommandRenderer;
pub use config::RendererConfig;
pub use error::{PipelineError, RenderError};
pub use html::{escape_html, BasicHtmlAssembler, HtmlRenderer};
pub use options::{GenerationOptions, OutputFormat, PageSize, RawOptions, Theme};
pub use runner::{validate_job_id, GenerationPipeline, MAX_JOB_ID_LEN};
pub use traits::{ContentAssembler, DocumentRenderer};
pub use types::{artifact_filename, ArtifactInfo, PipelineStatus, DOWNLOAD_PREFIX};
