//! Workflow definition types.
//!
//! These are the validated, display-oriented shapes produced by the parser.
//! Nothing here is ever executed; expressions are kept as raw strings.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

/// A complete, validated workflow definition.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDefinition {
    /// Path of the source file as given to the parser.
    pub source_path: PathBuf,

    /// Source file stem, used for output naming.
    pub file_stem: String,

    /// Display name (falls back to the file stem).
    pub name: String,

    /// Description from comment annotations, if any.
    pub description: Option<String>,

    /// `@author` annotation.
    pub author: Option<String>,

    /// `@version` annotation.
    pub version: Option<String>,

    /// Trigger events in declaration order.
    pub triggers: Vec<Trigger>,

    /// Inputs in declaration order (deduplicated by name).
    pub inputs: Vec<Input>,

    /// Workflow-level environment variables.
    pub env: IndexMap<String, String>,

    /// Workflow-level concurrency settings.
    pub concurrency: Option<Concurrency>,

    /// Workflow-level permissions, rendered for display.
    pub permissions: Option<String>,

    /// Jobs in declaration order.
    pub jobs: Vec<Job>,

    /// Raw source text.
    #[serde(skip)]
    pub raw: String,
}

impl WorkflowDefinition {
    /// Get a job by id.
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Total number of steps across all jobs.
    pub fn total_steps(&self) -> usize {
        self.jobs.iter().map(|j| j.steps.len()).sum()
    }

    /// Reusable workflow references, in job declaration order.
    pub fn workflow_calls(&self) -> Vec<(&str, &str)> {
        self.jobs
            .iter()
            .filter_map(|j| j.uses.as_deref().map(|u| (j.id.as_str(), u)))
            .collect()
    }
}

/// A normalized trigger event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    /// Event name (e.g. `push`, `workflow_dispatch`).
    pub event: String,

    /// Filters for the event (branches, paths, types, ...). Empty when none.
    pub filters: IndexMap<String, serde_yaml::Value>,
}

impl Trigger {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            filters: IndexMap::new(),
        }
    }

    /// Human description for well-known events.
    pub fn describe(&self) -> &'static str {
        match self.event.as_str() {
            "push" => "Triggered when code is pushed to the repository",
            "pull_request" => "Triggered when a pull request is opened, synchronized, or modified",
            "pull_request_target" => "Triggered by pull request activity in the context of the base branch",
            "workflow_dispatch" => "Manually triggered through the GitHub UI or API",
            "workflow_call" => "Called by another workflow as a reusable workflow",
            "workflow_run" => "Triggered when another workflow run is requested or completed",
            "schedule" => "Triggered on a scheduled basis",
            "repository_dispatch" => "Triggered by a custom webhook event",
            "release" => "Triggered by release activity",
            "merge_group" => "Triggered when a pull request is added to a merge queue",
            _ => "Triggers the workflow",
        }
    }
}

/// Declared input type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum InputType {
    #[default]
    String,
    Boolean,
    Choice,
    Number,
    Environment,
    /// Unrecognized type, preserved verbatim.
    Unknown(String),
}

impl InputType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "string" => InputType::String,
            "boolean" => InputType::Boolean,
            "choice" => InputType::Choice,
            "number" => InputType::Number,
            "environment" => InputType::Environment,
            other => InputType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::String => write!(f, "string"),
            InputType::Boolean => write!(f, "boolean"),
            InputType::Choice => write!(f, "choice"),
            InputType::Number => write!(f, "number"),
            InputType::Environment => write!(f, "environment"),
            InputType::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// Where an input was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Workflow,
    WorkflowDispatch,
    WorkflowCall,
}

/// Workflow input parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Input {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<String>,
    pub input_type: InputType,
    /// Options of a `choice` input.
    pub options: Vec<String>,
    pub source: InputSource,
}

/// Workflow concurrency group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Concurrency {
    pub group: String,
    /// Raw `cancel-in-progress` value (a bool or an expression).
    pub cancel_in_progress: Option<String>,
}

/// A job in the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Unique id within the workflow.
    pub id: String,

    /// Position of the job in the source file.
    pub declaration_index: usize,

    /// Display name (defaults to the id).
    pub name: String,

    /// Execution target, rendered for display.
    pub runs_on: Option<String>,

    /// Ids of jobs this one depends on, deduplicated, in declared order.
    pub needs: Vec<String>,

    /// Raw `if` expression.
    pub if_condition: Option<String>,

    pub strategy: Option<Strategy>,

    /// Reusable workflow reference.
    pub uses: Option<String>,

    /// Inputs passed to the reusable workflow.
    pub with: IndexMap<String, String>,

    /// Secrets passed to the reusable workflow (`inherit` or names).
    pub secrets: Option<String>,

    pub steps: Vec<Step>,

    pub outputs: IndexMap<String, String>,

    pub permissions: Option<String>,

    pub environment: Option<String>,

    pub timeout_minutes: Option<String>,
}

impl Job {
    pub fn is_conditional(&self) -> bool {
        self.if_condition.is_some()
    }

    pub fn is_matrix(&self) -> bool {
        self.strategy.as_ref().is_some_and(|s| s.matrix.is_some())
    }

    pub fn is_reusable_call(&self) -> bool {
        self.uses.is_some()
    }
}

/// Job strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub matrix: Option<Matrix>,
    pub fail_fast: bool,
    pub max_parallel: Option<u64>,
}

/// One matrix dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatrixAxis {
    Values(Vec<String>),
    /// Values computed at runtime (e.g. `${{ fromJson(...) }}`).
    Expression(String),
}

/// Matrix descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    pub dimensions: IndexMap<String, MatrixAxis>,
    /// Number of `include` entries.
    pub include: usize,
    /// Number of `exclude` entries.
    pub exclude: usize,
    /// Set when the whole matrix is an expression.
    pub expression: Option<String>,
}

impl Matrix {
    /// Number of combinations, when it can be known statically.
    ///
    /// This is the product of the dimension lengths; a matrix made only of
    /// `include` entries counts one combination per entry.
    pub fn combinations(&self) -> Option<usize> {
        if self.expression.is_some() {
            return None;
        }
        if self.dimensions.is_empty() {
            return Some(self.include);
        }
        let mut total = 1usize;
        for axis in self.dimensions.values() {
            match axis {
                MatrixAxis::Values(values) => total = total.saturating_mul(values.len()),
                MatrixAxis::Expression(_) => return None,
            }
        }
        Some(total)
    }

    /// Compact description such as `os: [ubuntu-latest, windows-latest], node: [18, 20]`.
    pub fn summary(&self) -> String {
        if let Some(expr) = &self.expression {
            return expr.clone();
        }
        let mut parts: Vec<String> = self
            .dimensions
            .iter()
            .map(|(name, axis)| match axis {
                MatrixAxis::Values(values) => format!("{}: [{}]", name, values.join(", ")),
                MatrixAxis::Expression(expr) => format!("{}: {}", name, expr),
            })
            .collect();
        if self.include > 0 {
            parts.push(format!("include: {}", self.include));
        }
        if self.exclude > 0 {
            parts.push(format!("exclude: {}", self.exclude));
        }
        parts.join(", ")
    }
}

/// A job step. Display-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub name: Option<String>,
    pub uses: Option<String>,
    pub run: Option<String>,
    pub shell: Option<String>,
    pub env: IndexMap<String, String>,
    pub if_condition: Option<String>,
}

impl Step {
    /// Label for listings: the name, else the action, else the first command line.
    pub fn label(&self) -> String {
        let label = self
            .name
            .clone()
            .or_else(|| self.uses.clone())
            .or_else(|| {
                self.run
                    .as_deref()
                    .and_then(|r| r.lines().map(str::trim).find(|l| !l.is_empty()))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Unnamed step".to_string());

        if label.chars().count() > 50 {
            let truncated: String = label.chars().take(47).collect();
            format!("{}...", truncated)
        } else {
            label
        }
    }

    /// Action name without the version ref (`actions/checkout@v4` -> `actions/checkout`).
    pub fn action(&self) -> Option<&str> {
        self.uses
            .as_deref()
            .map(|u| u.split('@').next().unwrap_or(u))
    }
}

/// Render a scalar YAML value as display text.
pub fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => None,
        serde_yaml::Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
    }
}

/// Render any YAML value as a single display line.
///
/// Sequences are joined with `, `; mappings become `key: value` pairs joined
/// with `, `. Order follows the source.
pub fn value_to_display(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        serde_yaml::Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| {
                let key = scalar_to_string(k).unwrap_or_default();
                match v {
                    serde_yaml::Value::Mapping(_) => format!("{}: {{{}}}", key, value_to_display(v)),
                    serde_yaml::Value::Sequence(_) => format!("{}: [{}]", key, value_to_display(v)),
                    _ => format!("{}: {}", key, value_to_display(v)),
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
        serde_yaml::Value::Null => "null".to_string(),
        other => scalar_to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_parse() {
        assert_eq!(InputType::parse("choice"), InputType::Choice);
        let unknown = InputType::parse("integer");
        assert_eq!(unknown, InputType::Unknown("integer".to_string()));
        assert_eq!(unknown.to_string(), "unknown");
    }

    #[test]
    fn test_matrix_combinations() {
        let mut dimensions = IndexMap::new();
        dimensions.insert(
            "os".to_string(),
            MatrixAxis::Values(vec!["ubuntu".into(), "windows".into()]),
        );
        dimensions.insert(
            "node".to_string(),
            MatrixAxis::Values(vec!["18".into(), "20".into(), "22".into()]),
        );
        let matrix = Matrix {
            dimensions,
            include: 1,
            exclude: 0,
            expression: None,
        };
        assert_eq!(matrix.combinations(), Some(6));
        assert_eq!(
            matrix.summary(),
            "os: [ubuntu, windows], node: [18, 20, 22], include: 1"
        );
    }

    #[test]
    fn test_matrix_expression_has_no_count() {
        let matrix = Matrix {
            dimensions: IndexMap::new(),
            include: 0,
            exclude: 0,
            expression: Some("${{ fromJson(needs.prep.outputs.matrix) }}".into()),
        };
        assert_eq!(matrix.combinations(), None);
    }

    #[test]
    fn test_step_label_fallbacks() {
        let step = Step {
            name: None,
            uses: None,
            run: Some("\n  cargo test --all-features\n  echo done".into()),
            shell: None,
            env: IndexMap::new(),
            if_condition: None,
        };
        assert_eq!(step.label(), "cargo test --all-features");

        let long = Step {
            name: Some("x".repeat(60)),
            ..step.clone()
        };
        assert_eq!(long.label().chars().count(), 50);
        assert!(long.label().ends_with("..."));
    }

    #[test]
    fn test_step_action_strips_ref() {
        let step = Step {
            name: None,
            uses: Some("actions/checkout@v4".into()),
            run: None,
            shell: None,
            env: IndexMap::new(),
            if_condition: None,
        };
        assert_eq!(step.action(), Some("actions/checkout"));
    }

    #[test]
    fn test_value_to_display() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("{branches: [main, 'release/*'], types: opened}").unwrap();
        assert_eq!(
            value_to_display(&value),
            "branches: [main, release/*], types: opened"
        );
    }
}
