//! Collaborator traits for document generation.

use async_trait::async_trait;
use std::path::Path;

use super::error::RenderError;
use super::options::{GenerationOptions, OutputFormat};
use crate::journal::JournalEntry;

/// Produces the document text for a processed entry collection.
#[async_trait]
pub trait ContentAssembler: Send + Sync {
    /// Returns the name of this assembler implementation.
    fn name(&self) -> &str;

    /// Assembles the document for `entries`.
    async fn assemble(
        &self,
        entries: &[JournalEntry],
        options: &GenerationOptions,
    ) -> Result<String, RenderError>;
}

/// Turns an assembled document into an artifact on disk.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Returns the name of this renderer implementation.
    fn name(&self) -> &str;

    /// The format this renderer produces.
    fn format(&self) -> OutputFormat;

    /// Writes the artifact to `output` and returns its size in bytes.
    async fn render(
        &self,
        document: &str,
        options: &GenerationOptions,
        output: &Path,
    ) -> Result<u64, RenderError>;
}
