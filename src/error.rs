//! Error types for gha-doc.
//!
//! Per-file errors (`Definition`, `Analysis`, `Sink`) abort the documentation of
//! one workflow file but never the whole batch. `NarrativeUnavailable` and
//! `RenderUnavailable` are degradations: callers log them and carry on.

use std::fmt;

use thiserror::Error;

/// Result type alias for gha-doc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// gha-doc error types.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Narrative unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("Diagram render unavailable: {0}")]
    RenderUnavailable(String),

    #[error("Cannot write output '{path}': {source}")]
    Sink {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Definition(_) => "DEFINITION_ERROR",
            Error::Analysis(_) => "ANALYSIS_ERROR",
            Error::NarrativeUnavailable(_) => "NARRATIVE_UNAVAILABLE",
            Error::RenderUnavailable(_) => "RENDER_UNAVAILABLE",
            Error::Sink { .. } => "SINK_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Template(_) => "TEMPLATE_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Whether this error only degrades the output instead of failing the file.
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            Error::NarrativeUnavailable(_) | Error::RenderUnavailable(_)
        )
    }

    pub fn sink(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Sink {
            path: path.into(),
            source,
        }
    }
}

/// What went wrong while building a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionErrorKind {
    /// The source is not valid YAML, or not a mapping at the top level.
    MalformedSource,
    /// A required top-level section (`on`, `jobs`) is absent.
    MissingSection,
    /// Two jobs share the same id.
    DuplicateJobId,
    /// A field has a shape this tool does not understand.
    InvalidField,
}

impl fmt::Display for DefinitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionErrorKind::MalformedSource => write!(f, "malformed_source"),
            DefinitionErrorKind::MissingSection => write!(f, "missing_section"),
            DefinitionErrorKind::DuplicateJobId => write!(f, "duplicate_job_id"),
            DefinitionErrorKind::InvalidField => write!(f, "invalid_field"),
        }
    }
}

/// A structurally invalid workflow source, with the offending field path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at '{path}': {message}")]
pub struct DefinitionError {
    pub kind: DefinitionErrorKind,
    /// Dotted field path, e.g. `jobs.build.needs`. Empty for the document root.
    pub path: String,
    pub message: String,
}

impl DefinitionError {
    pub fn new(
        kind: DefinitionErrorKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DefinitionErrorKind::MalformedSource, "", message)
    }

    pub fn missing_section(section: &str) -> Self {
        Self::new(
            DefinitionErrorKind::MissingSection,
            section,
            format!("required section '{}' is missing", section),
        )
    }

    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DefinitionErrorKind::InvalidField, path, message)
    }
}

/// A `needs` entry naming a job that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingNeed {
    /// The job declaring the dependency.
    pub job: String,
    /// The id it refers to.
    pub missing: String,
}

/// What kind of graph-level problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    UnknownDependency,
    CyclicDependency,
}

/// Graph-level invalid input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("unknown dependencies: {}", format_dangling(.dangling))]
    UnknownDependency { dangling: Vec<DanglingNeed> },

    #[error("circular dependency: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Jobs on the cycle in dependency order; the first id is repeated at the end.
        cycle: Vec<String>,
    },
}

impl AnalysisError {
    pub fn kind(&self) -> AnalysisErrorKind {
        match self {
            AnalysisError::UnknownDependency { .. } => AnalysisErrorKind::UnknownDependency,
            AnalysisError::CyclicDependency { .. } => AnalysisErrorKind::CyclicDependency,
        }
    }

    /// The unresolved ids, deduplicated, in order of first reference.
    pub fn refs(&self) -> Vec<String> {
        match self {
            AnalysisError::UnknownDependency { dangling } => {
                let mut refs: Vec<String> = Vec::new();
                for d in dangling {
                    if !refs.contains(&d.missing) {
                        refs.push(d.missing.clone());
                    }
                }
                refs
            }
            AnalysisError::CyclicDependency { .. } => Vec::new(),
        }
    }
}

fn format_dangling(dangling: &[DanglingNeed]) -> String {
    dangling
        .iter()
        .map(|d| format!("'{}' needs '{}'", d.job, d.missing))
        .collect::<Vec<_>>()
        .join(", ")
}
