//! Workflow file discovery.
//!
//! Patterns are relative to the workspace and use `glob` syntax: `*` and `?`
//! match within one path component, a `**` component matches any number of
//! directories.

use std::path::{Path, PathBuf};

use glob::glob;
use tracing::debug;

use crate::error::{Error, Result};

/// A discovered workflow file and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSource {
    pub path: PathBuf,
    pub raw: String,
}

impl WorkflowSource {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            raw,
        })
    }
}

/// Find the files matching `pattern` under `workspace`, sorted by path.
///
/// A base directory that does not exist yields no files.
pub fn discover(workspace: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = pattern.trim().trim_start_matches("./");
    if pattern.is_empty() {
        return Err(Error::Config("Workflow file pattern is empty".to_string()));
    }

    let full = workspace.join(pattern);
    debug!(pattern = %full.display(), "Discovering workflow files");

    let entries = glob(&full.to_string_lossy())
        .map_err(|e| Error::Config(format!("Invalid workflow file pattern '{}': {}", pattern, e)))?;

    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| e.into_error())?;
        if path.is_file() {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}
