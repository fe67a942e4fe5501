//! Mock assembler and renderer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::journal::JournalEntry;
use crate::pipeline::{
    ContentAssembler, DocumentRenderer, GenerationOptions, OutputFormat, RenderError,
};

/// A recorded assembly for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAssembly {
    pub entries: Vec<JournalEntry>,
    pub options: GenerationOptions,
}

/// Mock implementation of the ContentAssembler trait.
///
/// Produces one line per entry (date, content, then album locators) so
/// tests can assert on substituted media.
#[derive(Debug, Clone)]
pub struct MockAssembler {
    assemblies: Arc<RwLock<Vec<RecordedAssembly>>>,
    next_error: Arc<RwLock<Option<RenderError>>>,
}

impl Default for MockAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssembler {
    /// Create a new mock assembler.
    pub fn new() -> Self {
        Self {
            assemblies: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded assemblies.
    pub async fn recorded_assemblies(&self) -> Vec<RecordedAssembly> {
        self.assemblies.read().await.clone()
    }

    /// Configure the next assembly to fail with the given error.
    pub async fn set_next_error(&self, error: RenderError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl ContentAssembler for MockAssembler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn assemble(
        &self,
        entries: &[JournalEntry],
        options: &GenerationOptions,
    ) -> Result<String, RenderError> {
        self.assemblies.write().await.push(RecordedAssembly {
            entries: entries.to_vec(),
            options: options.clone(),
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let mut document = String::new();
        for entry in entries {
            document.push_str(&entry.date);
            if let Some(content) = &entry.content {
                document.push(' ');
                document.push_str(content);
            }
            for item in entry.album.iter().flatten() {
                document.push(' ');
                document.push_str(&item.url);
            }
            document.push('\n');
        }
        Ok(document)
    }
}

/// A recorded render for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRender {
    pub document: String,
    pub output: PathBuf,
}

/// Mock implementation of the DocumentRenderer trait.
///
/// Writes the document to the requested path unless an error is queued.
#[derive(Debug, Clone)]
pub struct MockRenderer {
    format: OutputFormat,
    renders: Arc<RwLock<Vec<RecordedRender>>>,
    next_error: Arc<RwLock<Option<RenderError>>>,
    /// Bytes written before a queued error is returned.
    partial_write: Arc<RwLock<bool>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockRenderer {
    /// Create a mock renderer producing `format`.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            renders: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            partial_write: Arc::new(RwLock::new(false)),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded renders.
    pub async fn recorded_renders(&self) -> Vec<RecordedRender> {
        self.renders.read().await.clone()
    }

    /// Configure the next render to fail with the given error.
    pub async fn set_next_error(&self, error: RenderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Write the output file before failing, leaving a partial artifact.
    pub async fn set_partial_write(&self, partial: bool) {
        *self.partial_write.write().await = partial;
    }

    /// Delay every render by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }
}

#[async_trait]
impl DocumentRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    fn format(&self) -> OutputFormat {
        self.format
    }

    async fn render(
        &self,
        document: &str,
        _options: &GenerationOptions,
        output: &Path,
    ) -> Result<u64, RenderError> {
        self.renders.write().await.push(RecordedRender {
            document: document.to_string(),
            output: output.to_path_buf(),
        });

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Some(error) = self.next_error.write().await.take() {
            if *self.partial_write.read().await {
                tokio::fs::write(output, &document.as_bytes()[..document.len() / 2]).await?;
            }
            return Err(error);
        }

        tokio::fs::write(output, document.as_bytes()).await?;
        Ok(document.len() as u64)
    }
}
