//! Renderer backed by an external program.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::RendererConfig;
use super::error::RenderError;
use super::options::{GenerationOptions, OutputFormat};
use super::traits::DocumentRenderer;

/// Runs a configured command (typically a headless browser) that turns the
/// assembled HTML into a paginated document.
pub struct CommandRenderer {
    program: PathBuf,
    args: Vec<String>,
    config: RendererConfig,
}

impl CommandRenderer {
    /// Returns `None` when no command is configured.
    pub fn from_config(config: &RendererConfig) -> Option<Self> {
        let program = config.command.clone()?;
        Some(Self {
            program,
            args: config.args.clone(),
            config: config.clone(),
        })
    }

    /// Substitutes job placeholders into the configured arguments.
    fn build_args(&self, input: &Path, output: &Path, options: &GenerationOptions) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{page_size}", options.page_size.as_str())
            })
            .collect()
    }

    fn source_path(output: &Path) -> PathBuf {
        let mut name = output
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".source.html");
        output.with_file_name(name)
    }

    async fn run(&self, args: &[String]) -> Result<(), RenderError> {
        debug!("Running renderer {:?} with args: {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::RendererNotFound {
                        path: self.program.clone(),
                    }
                } else {
                    RenderError::Io(e)
                }
            })?;

        let output = match timeout(self.config.timeout(), child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "Renderer {:?} timed out after {}s",
                    self.program, self.config.timeout_secs
                );
                return Err(RenderError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RenderError::render_failed(
                format!("renderer exited with {}", output.status),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentRenderer for CommandRenderer {
    fn name(&self) -> &str {
        "command"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    async fn render(
        &self,
        document: &str,
        options: &GenerationOptions,
        output: &Path,
    ) -> Result<u64, RenderError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let source = Self::source_path(output);
        tokio::fs::write(&source, document.as_bytes()).await?;

        let args = self.build_args(&source, output, options);
        let result = self.run(&args).await;
        let _ = tokio::fs::remove_file(&source).await;
        result?;

        match tokio::fs::metadata(output).await {
            Ok(meta) => Ok(meta.len()),
            Err(_) => Err(RenderError::render_failed(
                format!("renderer produced no file at {}", output.display()),
                None,
            )),
        }
    }
}
