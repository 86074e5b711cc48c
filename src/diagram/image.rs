//! Diagram image rendering.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use super::{to_mermaid, DiagramDescription};
use crate::error::{Error, Result};

/// Image format for rendered diagrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            "pdf" => Ok(ImageFormat::Pdf),
            other => Err(Error::Config(format!(
                "Unsupported diagram format '{}' (expected png, svg or pdf)",
                other
            ))),
        }
    }
}

/// Renders a diagram description to image bytes.
///
/// Failures are reported as [`Error::RenderUnavailable`]; callers fall back to
/// the Mermaid source.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render_image(&self, diagram: &DiagramDescription, format: ImageFormat)
        -> Result<Vec<u8>>;
}

/// Renders through the Mermaid CLI (`mmdc`).
#[derive(Debug, Clone)]
pub struct MermaidCli {
    command: String,
    theme: String,
    background: String,
    timeout: Duration,
}

impl MermaidCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            theme: "forest".to_string(),
            background: "transparent".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for MermaidCli {
    fn default() -> Self {
        Self::new("mmdc")
    }
}

#[async_trait]
impl ImageRenderer for MermaidCli {
    async fn render_image(
        &self,
        diagram: &DiagramDescription,
        format: ImageFormat,
    ) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()
            .map_err(|e| Error::RenderUnavailable(format!("Cannot create scratch directory: {}", e)))?;
        let input = dir.path().join("diagram.mmd");
        let output = dir.path().join(format!("diagram.{}", format.extension()));

        tokio::fs::write(&input, to_mermaid(diagram))
            .await
            .map_err(|e| Error::RenderUnavailable(format!("Cannot write diagram source: {}", e)))?;

        debug!(command = %self.command, format = %format, "Rendering diagram");

        let run = Command::new(&self.command)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(&self.theme)
            .arg("-b")
            .arg(&self.background)
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                Error::RenderUnavailable(format!(
                    "{} timed out after {}s",
                    self.command,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::RenderUnavailable(format!("Cannot run {}: {}", self.command, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::RenderUnavailable(format!(
                "{} exited with {}: {}",
                self.command,
                result.status,
                stderr.trim()
            )));
        }

        tokio::fs::read(&output)
            .await
            .map_err(|e| Error::RenderUnavailable(format!("{} produced no output: {}", self.command, e)))
    }
}
