//! Configuration management.
//!
//! gha-doc configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - User config file (~/.config/gha-doc/config.toml)
//! - Workspace config file (<workspace>/.gha-doc.toml)
//! - Environment variables (GHADOC_*)
//! - Command-line flags (applied by the binary)
//!
//! Config files may declare only the sections they care about. API keys are
//! never read from or written to config files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagram::{ImageFormat, StyleOptions};
use crate::docs::OutputFormat;
use crate::error::{Error, Result};

/// Name of the per-workspace config file.
pub const WORKSPACE_CONFIG_FILE: &str = ".gha-doc.toml";

/// gha-doc configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Workflow discovery
    #[serde(default)]
    pub input: InputConfig,

    /// Documentation output
    #[serde(default)]
    pub output: OutputConfig,

    /// Dependency diagrams
    #[serde(default)]
    pub diagram: DiagramConfig,

    /// AI narrative sections
    #[serde(default)]
    pub ai: AiConfig,
}

/// Workflow discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Glob pattern, relative to the workspace
    #[serde(default = "default_workflow_files")]
    pub workflow_files: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            workflow_files: default_workflow_files(),
        }
    }
}

fn default_workflow_files() -> String {
    ".github/workflows/*.yml".to_string()
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination directory, relative to the workspace
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,

    /// Append the raw workflow YAML to each document
    #[serde(default)]
    pub include_source: bool,

    /// Write an index.md with the cross-workflow call graph
    #[serde(default)]
    pub index: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
            include_source: false,
            index: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs/workflows")
}

/// Diagram configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Render diagram images (the Mermaid source is always embedded)
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub format: ImageFormat,

    /// Mermaid CLI executable
    #[serde(default = "default_mermaid_command")]
    pub command: String,

    #[serde(default = "default_mermaid_theme")]
    pub theme: String,

    #[serde(default = "default_render_timeout")]
    pub timeout_seconds: u64,

    #[serde(flatten)]
    pub style: StyleOptions,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ImageFormat::default(),
            command: default_mermaid_command(),
            theme: default_mermaid_theme(),
            timeout_seconds: default_render_timeout(),
            style: StyleOptions::default(),
        }
    }
}

impl DiagramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_true() -> bool {
    true
}

fn default_mermaid_command() -> String {
    "mmdc".to_string()
}

fn default_mermaid_theme() -> String {
    "forest".to_string()
}

fn default_render_timeout() -> u64 {
    60
}

/// AI narrative configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Registered provider name (`openai`, `agent`)
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    /// Endpoint override for the selected provider
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on the length of each generated section
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    /// Only ever set from the environment or the command line.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_ai_provider(),
            endpoint: None,
            model: None,
            timeout_seconds: default_ai_timeout(),
            temperature: default_temperature(),
            max_words: default_max_words(),
            api_key: None,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_ai_provider() -> String {
    "openai".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_words() -> usize {
    300
}

impl Config {
    /// Load configuration for a workspace from default locations and the
    /// environment.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut config = Self::default();

        let user_path = Self::config_dir().join("config.toml");
        if let Some(partial) = Self::load_partial_from_path(&user_path)? {
            config.apply_partial(partial);
        }

        let workspace_path = workspace.join(WORKSPACE_CONFIG_FILE);
        if let Some(partial) = Self::load_partial_from_path(&workspace_path)? {
            config.apply_partial(partial);
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("gha-doc"))
            .unwrap_or_else(|| PathBuf::from(".gha-doc"))
    }

    /// Apply `GHADOC_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    fn apply_env_with(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(pattern) = var("GHADOC_WORKFLOW_FILES") {
            self.input.workflow_files = pattern;
        }
        if let Some(dir) = var("GHADOC_OUTPUT_DIR") {
            self.output.output_dir = PathBuf::from(dir);
        }
        if let Some(format) = var("GHADOC_FORMAT") {
            self.output.format = format.parse()?;
        }
        if let Some(flag) = var("GHADOC_INCLUDE_SOURCE") {
            self.output.include_source = parse_flag("GHADOC_INCLUDE_SOURCE", &flag)?;
        }
        if let Some(flag) = var("GHADOC_INDEX") {
            self.output.index = parse_flag("GHADOC_INDEX", &flag)?;
        }
        if let Some(flag) = var("GHADOC_GENERATE_DIAGRAMS") {
            self.diagram.enabled = parse_flag("GHADOC_GENERATE_DIAGRAMS", &flag)?;
        }
        if let Some(format) = var("GHADOC_DIAGRAM_FORMAT") {
            self.diagram.format = format.parse()?;
        }
        if let Some(command) = var("GHADOC_MERMAID_COMMAND") {
            self.diagram.command = command;
        }
        if let Some(flag) = var("GHADOC_AI_ENHANCEMENT") {
            self.ai.enabled = parse_flag("GHADOC_AI_ENHANCEMENT", &flag)?;
        }
        if let Some(provider) = var("GHADOC_AI_PROVIDER") {
            self.ai.provider = provider;
        }
        if let Some(endpoint) = var("GHADOC_AI_ENDPOINT") {
            self.ai.endpoint = Some(endpoint);
        }
        if let Some(model) = var("GHADOC_AI_MODEL") {
            self.ai.model = Some(model);
        }
        if let Some(timeout) = var("GHADOC_AI_TIMEOUT_SECONDS") {
            self.ai.timeout_seconds = timeout.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "Invalid value for GHADOC_AI_TIMEOUT_SECONDS: '{}' (expected whole seconds)",
                    timeout
                ))
            })?;
        }
        if let Some(key) = var("GHADOC_AI_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            if !key.trim().is_empty() {
                self.ai.api_key = Some(key);
            }
        }
        Ok(())
    }

    fn load_partial_from_path(path: &Path) -> Result<Option<PartialConfig>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(input) = partial.input {
            self.input = input;
        }
        if let Some(output) = partial.output {
            self.output = output;
        }
        if let Some(diagram) = partial.diagram {
            self.diagram = diagram;
        }
        if let Some(ai) = partial.ai {
            self.ai = AiConfig {
                api_key: self.ai.api_key.take(),
                ..ai
            };
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    input: Option<InputConfig>,
    output: Option<OutputConfig>,
    diagram: Option<DiagramConfig>,
    ai: Option<AiConfig>,
}

/// Parse a boolean flag value as GitHub Actions inputs spell them.
pub fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input.workflow_files, ".github/workflows/*.yml");
        assert_eq!(config.output.output_dir, PathBuf::from("docs/workflows"));
        assert_eq!(config.output.format, OutputFormat::Markdown);
        assert!(config.diagram.enabled);
        assert_eq!(config.diagram.format, ImageFormat::Png);
        assert_eq!(config.diagram.style.hub_threshold, 3);
        assert!(!config.ai.enabled);
        assert_eq!(config.ai.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_workspace_file_overrides_only_declared_sections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            r#"
[output]
format = "html"
include_source = true

[diagram]
format = "svg"
hub_threshold = 5
"#,
        )
        .unwrap();

        let mut config = Config::default();
        let partial = Config::load_partial_from_path(&dir.path().join(WORKSPACE_CONFIG_FILE))
            .unwrap()
            .unwrap();
        config.apply_partial(partial);

        assert_eq!(config.output.format, OutputFormat::Html);
        assert!(config.output.include_source);
        assert_eq!(config.output.output_dir, PathBuf::from("docs/workflows"));
        assert_eq!(config.diagram.format, ImageFormat::Svg);
        assert_eq!(config.diagram.style.hub_threshold, 5);
        assert!(config.diagram.style.highlight_deployments);
        assert_eq!(config.input.workflow_files, ".github/workflows/*.yml");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let partial = Config::load_partial_from_path(&dir.path().join("nope.toml")).unwrap();
        assert!(partial.is_none());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORKSPACE_CONFIG_FILE);
        std::fs::write(&path, "[output\nformat = ").unwrap();
        let err = Config::load_partial_from_path(&path).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GHADOC_FORMAT", "html"),
            ("GHADOC_GENERATE_DIAGRAMS", "false"),
            ("GHADOC_DIAGRAM_FORMAT", "pdf"),
            ("GHADOC_AI_ENHANCEMENT", "true"),
            ("GHADOC_AI_PROVIDER", "agent"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.output.format, OutputFormat::Html);
        assert!(!config.diagram.enabled);
        assert_eq!(config.diagram.format, ImageFormat::Pdf);
        assert!(config.ai.enabled);
        assert_eq!(config.ai.provider, "agent");
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_env_flag() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| (k == "GHADOC_INCLUDE_SOURCE").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("GHADOC_INCLUDE_SOURCE"));
    }

    #[test]
    fn test_invalid_env_timeout() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| (k == "GHADOC_AI_TIMEOUT_SECONDS").then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("GHADOC_AI_TIMEOUT_SECONDS"));

        config
            .apply_env_with(|k| (k == "GHADOC_AI_TIMEOUT_SECONDS").then(|| "45".to_string()))
            .unwrap();
        assert_eq!(config.ai.timeout_seconds, 45);
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let mut config = Config::default();
        config.ai.api_key = Some("sk-secret".to_string());
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("sk-secret"));
    }
}
