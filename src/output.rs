//! Output sinks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Destination for generated files.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Write `content` at `relative`, replacing any existing file. Returns the
    /// path written.
    async fn write(&self, relative: &Path, content: &[u8]) -> Result<PathBuf>;
}

/// Writes under a root directory, creating directories as needed.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl OutputSink for FsSink {
    async fn write(&self, relative: &Path, content: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(relative);
        let shown = path.display().to_string();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::sink(shown.clone(), e))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| Error::sink(shown, e))?;

        debug!(path = %path.display(), bytes = content.len(), "Wrote output file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path().join("docs/workflows"));

        let path = sink.write(Path::new("ci.md"), b"first").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        sink.write(Path::new("ci.md"), b"second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_failure_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let sink = FsSink::new(&blocker);
        let err = sink.write(Path::new("ci.md"), b"x").await.unwrap_err();
        assert_eq!(err.code(), "SINK_ERROR");
        assert!(err.to_string().contains("ci.md"));
    }
}
