//! Workflow YAML parser.
//!
//! Decoding happens in two passes: `serde_yaml` turns the text into generic
//! values, then every section is validated into the typed model. Shape errors
//! carry the dotted path of the offending field.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::annotations::{extract_annotations, Annotations};
use super::types::{
    scalar_to_string, value_to_display, Concurrency, Input, InputSource, InputType, Job, Matrix,
    MatrixAxis, Step, Strategy, Trigger, WorkflowDefinition,
};
use crate::error::{DefinitionError, DefinitionErrorKind, Result};

type ParseResult<T> = std::result::Result<T, DefinitionError>;

/// Top-level document shape. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    on: Option<Value>,
    #[serde(default)]
    inputs: Option<Value>,
    #[serde(default)]
    env: Option<Value>,
    #[serde(default)]
    concurrency: Option<Value>,
    #[serde(default)]
    permissions: Option<Value>,
    #[serde(default)]
    jobs: Option<RawJobs>,
}

/// Jobs as an ordered list of entries.
///
/// Decoded through a visitor rather than a `Mapping` so duplicate ids survive
/// decoding and can be reported as such.
#[derive(Debug)]
struct RawJobs(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawJobs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct JobsVisitor;

        impl<'de> Visitor<'de> for JobsVisitor {
            type Value = RawJobs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of job ids to job definitions")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawJobs, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut jobs = Vec::new();
                while let Some((id, job)) = map.next_entry::<String, Value>()? {
                    jobs.push((id, job));
                }
                Ok(RawJobs(jobs))
            }
        }

        deserializer.deserialize_map(JobsVisitor)
    }
}

/// Parse a workflow from YAML text.
///
/// `source_path` is used for the name fallback and output naming only; the
/// file is not read.
pub fn parse_workflow(yaml: &str, source_path: &Path) -> ParseResult<WorkflowDefinition> {
    if yaml.trim().is_empty() {
        return Err(DefinitionError::malformed("Empty workflow definition"));
    }

    let doc: RawDocument = serde_yaml::from_str(yaml)
        .map_err(|e| DefinitionError::malformed(format!("Invalid YAML: {}", e)))?;

    let on = doc
        .on
        .filter(|v| !v.is_null())
        .ok_or_else(|| DefinitionError::missing_section("on"))?;
    let raw_jobs = doc
        .jobs
        .ok_or_else(|| DefinitionError::missing_section("jobs"))?;

    let annotations = extract_annotations(yaml);

    let file_stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow".to_string());

    let name = match doc.name.as_ref() {
        Some(value) => scalar_to_string(value)
            .ok_or_else(|| DefinitionError::invalid("name", "expected a string"))?,
        None => file_stem.clone(),
    };

    let triggers = parse_triggers(&on)?;
    let inputs = parse_inputs(doc.inputs.as_ref(), &on, &annotations)?;
    let env = match doc.env.as_ref() {
        Some(value) => string_map(value, "env")?,
        None => IndexMap::new(),
    };
    let concurrency = doc
        .concurrency
        .as_ref()
        .map(parse_concurrency)
        .transpose()?;
    let permissions = doc
        .permissions
        .as_ref()
        .filter(|v| !v.is_null())
        .map(value_to_display);
    let jobs = parse_jobs(raw_jobs)?;

    Ok(WorkflowDefinition {
        source_path: source_path.to_path_buf(),
        file_stem,
        name,
        description: annotations.description.clone(),
        author: annotations.author.clone(),
        version: annotations.version.clone(),
        triggers,
        inputs,
        env,
        concurrency,
        permissions,
        jobs,
        raw: yaml.to_string(),
    })
}

/// Parse a workflow from a file path.
pub fn parse_workflow_file(path: &Path) -> Result<WorkflowDefinition> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_workflow(&content, path)?)
}

fn parse_triggers(on: &Value) -> ParseResult<Vec<Trigger>> {
    match on {
        Value::String(event) => Ok(vec![Trigger::new(event.clone())]),
        Value::Sequence(events) => events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                event
                    .as_str()
                    .map(Trigger::new)
                    .ok_or_else(|| DefinitionError::invalid(format!("on[{}]", i), "expected an event name"))
            })
            .collect(),
        Value::Mapping(events) => {
            let mut triggers = Vec::with_capacity(events.len());
            for (key, config) in events {
                let event = key
                    .as_str()
                    .ok_or_else(|| DefinitionError::invalid("on", "event names must be strings"))?;
                triggers.push(Trigger {
                    event: event.to_string(),
                    filters: parse_trigger_filters(event, config)?,
                });
            }
            Ok(triggers)
        }
        _ => Err(DefinitionError::invalid(
            "on",
            "expected an event name, a list of events, or a mapping of events",
        )),
    }
}

fn parse_trigger_filters(event: &str, config: &Value) -> ParseResult<IndexMap<String, Value>> {
    let mut filters = IndexMap::new();
    match config {
        Value::Null => {}
        Value::Mapping(map) => {
            for (key, value) in map {
                let key = key.as_str().ok_or_else(|| {
                    DefinitionError::invalid(format!("on.{}", event), "filter names must be strings")
                })?;
                // Inputs and outputs get their own tables.
                if matches!(event, "workflow_dispatch" | "workflow_call")
                    && matches!(key, "inputs" | "outputs")
                {
                    continue;
                }
                filters.insert(key.to_string(), value.clone());
            }
        }
        Value::Sequence(entries) if event == "schedule" => {
            let crons: Vec<Value> = entries
                .iter()
                .filter_map(|entry| entry.get("cron").cloned())
                .collect();
            filters.insert("cron".to_string(), Value::Sequence(crons));
        }
        Value::Sequence(entries) => {
            filters.insert("values".to_string(), Value::Sequence(entries.clone()));
        }
        _ => {
            return Err(DefinitionError::invalid(
                format!("on.{}", event),
                "expected a mapping of filters",
            ))
        }
    }
    Ok(filters)
}

fn parse_inputs(
    top_level: Option<&Value>,
    on: &Value,
    annotations: &Annotations,
) -> ParseResult<Vec<Input>> {
    let mut inputs: Vec<Input> = Vec::new();

    let mut sources: Vec<(&Value, InputSource, String)> = Vec::new();
    if let Some(value) = top_level.filter(|v| !v.is_null()) {
        sources.push((value, InputSource::Workflow, "inputs".to_string()));
    }
    for (event, source) in [
        ("workflow_dispatch", InputSource::WorkflowDispatch),
        ("workflow_call", InputSource::WorkflowCall),
    ] {
        if let Some(value) = on
            .get(event)
            .and_then(|e| e.get("inputs"))
            .filter(|v| !v.is_null())
        {
            sources.push((value, source, format!("on.{}.inputs", event)));
        }
    }

    for (value, source, path) in sources {
        let map = value
            .as_mapping()
            .ok_or_else(|| DefinitionError::invalid(&path, "expected a mapping of inputs"))?;
        for (key, config) in map {
            let name = key
                .as_str()
                .ok_or_else(|| DefinitionError::invalid(&path, "input names must be strings"))?;
            if inputs.iter().any(|i| i.name == name) {
                continue;
            }
            let input_path = format!("{}.{}", path, name);
            inputs.push(parse_input(name, config, source, &input_path, annotations)?);
        }
    }

    Ok(inputs)
}

fn parse_input(
    name: &str,
    config: &Value,
    source: InputSource,
    path: &str,
    annotations: &Annotations,
) -> ParseResult<Input> {
    let empty = Mapping::new();
    let map = match config {
        Value::Null => &empty,
        Value::Mapping(map) => map,
        _ => return Err(DefinitionError::invalid(path, "expected a mapping")),
    };
    let annotation = annotations.inputs.get(name);

    let declared_description = map
        .get("description")
        .and_then(scalar_to_string)
        .filter(|d| !d.trim().is_empty());
    let description = declared_description
        .or_else(|| annotation.and_then(|a| a.description.clone()));

    let required = match map.get("required") {
        Some(value) => parse_bool(value)
            .ok_or_else(|| DefinitionError::invalid(format!("{}.required", path), "expected a boolean"))?,
        None => annotation.and_then(|a| a.required).unwrap_or(false),
    };

    let input_type = match map.get("type") {
        Some(value) => {
            let raw = scalar_to_string(value)
                .ok_or_else(|| DefinitionError::invalid(format!("{}.type", path), "expected a string"))?;
            InputType::parse(&raw)
        }
        None => InputType::default(),
    };

    let options = match map.get("options") {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(DefinitionError::invalid(
                format!("{}.options", path),
                "expected a list",
            ))
        }
    };

    Ok(Input {
        name: name.to_string(),
        description,
        required,
        default: map.get("default").and_then(scalar_to_string),
        input_type,
        options,
        source,
    })
}

fn parse_concurrency(value: &Value) -> ParseResult<Concurrency> {
    match value {
        Value::Mapping(map) => Ok(Concurrency {
            group: map
                .get("group")
                .and_then(scalar_to_string)
                .ok_or_else(|| DefinitionError::invalid("concurrency.group", "expected a string"))?,
            cancel_in_progress: map.get("cancel-in-progress").and_then(scalar_to_string),
        }),
        other => scalar_to_string(other)
            .map(|group| Concurrency {
                group,
                cancel_in_progress: None,
            })
            .ok_or_else(|| DefinitionError::invalid("concurrency", "expected a string or a mapping")),
    }
}

fn parse_jobs(raw: RawJobs) -> ParseResult<Vec<Job>> {
    let mut jobs: Vec<Job> = Vec::with_capacity(raw.0.len());

    for (index, (id, value)) in raw.0.into_iter().enumerate() {
        if jobs.iter().any(|j| j.id == id) {
            return Err(DefinitionError::new(
                DefinitionErrorKind::DuplicateJobId,
                format!("jobs.{}", id),
                format!("job id '{}' is declared more than once", id),
            ));
        }
        jobs.push(parse_job(&id, index, value)?);
    }

    Ok(jobs)
}

fn parse_job(id: &str, declaration_index: usize, mut value: Value) -> ParseResult<Job> {
    let path = format!("jobs.{}", id);
    value
        .apply_merge()
        .map_err(|e| DefinitionError::invalid(&path, e.to_string()))?;
    let map = value
        .as_mapping()
        .ok_or_else(|| DefinitionError::invalid(&path, "expected a mapping"))?;

    let name = match map.get("name") {
        Some(v) => scalar_to_string(v)
            .ok_or_else(|| DefinitionError::invalid(format!("{}.name", path), "expected a string"))?,
        None => id.to_string(),
    };

    let needs = match map.get("needs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(items)) => {
            let mut needs: Vec<String> = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let dep = item.as_str().ok_or_else(|| {
                    DefinitionError::invalid(format!("{}.needs[{}]", path, i), "expected a job id")
                })?;
                if !needs.iter().any(|n| n == dep) {
                    needs.push(dep.to_string());
                }
            }
            needs
        }
        Some(_) => {
            return Err(DefinitionError::invalid(
                format!("{}.needs", path),
                "expected a job id or a list of job ids",
            ))
        }
    };

    let uses = optional_string(map, "uses", &path)?;

    let steps = match map.get("steps") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(i, step)| parse_step(step, &format!("{}.steps[{}]", path, i)))
            .collect::<ParseResult<Vec<_>>>()?,
        Some(_) => {
            return Err(DefinitionError::invalid(
                format!("{}.steps", path),
                "expected a list of steps",
            ))
        }
    };

    if uses.is_none() && steps.is_empty() {
        return Err(DefinitionError::invalid(
            &path,
            "a job must declare either `steps` or `uses`",
        ));
    }

    let strategy = match map.get("strategy") {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_strategy(v, &format!("{}.strategy", path))?),
    };

    let with = match map.get("with") {
        Some(v) => string_map(v, &format!("{}.with", path))?,
        None => IndexMap::new(),
    };

    let secrets = match map.get("secrets") {
        None | Some(Value::Null) => None,
        Some(Value::Mapping(m)) => Some(
            m.keys()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Some(other) => scalar_to_string(other),
    };

    let outputs = match map.get("outputs") {
        Some(v) => string_map(v, &format!("{}.outputs", path))?,
        None => IndexMap::new(),
    };

    let environment = match map.get("environment") {
        None | Some(Value::Null) => None,
        Some(Value::Mapping(m)) => m.get("name").and_then(scalar_to_string),
        Some(other) => scalar_to_string(other),
    };

    Ok(Job {
        id: id.to_string(),
        declaration_index,
        name,
        runs_on: map
            .get("runs-on")
            .filter(|v| !v.is_null())
            .map(value_to_display),
        needs,
        if_condition: map.get("if").and_then(scalar_to_string),
        strategy,
        uses,
        with,
        secrets,
        steps,
        outputs,
        permissions: map
            .get("permissions")
            .filter(|v| !v.is_null())
            .map(value_to_display),
        environment,
        timeout_minutes: map.get("timeout-minutes").and_then(scalar_to_string),
    })
}

fn parse_strategy(value: &Value, path: &str) -> ParseResult<Strategy> {
    let map = value
        .as_mapping()
        .ok_or_else(|| DefinitionError::invalid(path, "expected a mapping"))?;

    let matrix = match map.get("matrix") {
        None | Some(Value::Null) => None,
        Some(Value::String(expr)) => Some(Matrix {
            dimensions: IndexMap::new(),
            include: 0,
            exclude: 0,
            expression: Some(expr.clone()),
        }),
        Some(Value::Mapping(m)) => Some(parse_matrix(m, &format!("{}.matrix", path))?),
        Some(_) => {
            return Err(DefinitionError::invalid(
                format!("{}.matrix", path),
                "expected a mapping or an expression",
            ))
        }
    };

    Ok(Strategy {
        matrix,
        fail_fast: map
            .get("fail-fast")
            .and_then(parse_bool)
            .unwrap_or(true),
        max_parallel: map.get("max-parallel").and_then(|v| v.as_u64()),
    })
}

fn parse_matrix(map: &Mapping, path: &str) -> ParseResult<Matrix> {
    let mut matrix = Matrix {
        dimensions: IndexMap::new(),
        include: 0,
        exclude: 0,
        expression: None,
    };

    for (key, value) in map {
        let key = key
            .as_str()
            .ok_or_else(|| DefinitionError::invalid(path, "matrix keys must be strings"))?;
        let count = |v: &Value| match v {
            Value::Sequence(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };
        match key {
            "include" => matrix.include = count(value),
            "exclude" => matrix.exclude = count(value),
            _ => {
                let axis = match value {
                    Value::Sequence(items) => {
                        MatrixAxis::Values(items.iter().map(value_to_display).collect())
                    }
                    Value::String(expr) => MatrixAxis::Expression(expr.clone()),
                    _ => {
                        return Err(DefinitionError::invalid(
                            format!("{}.{}", path, key),
                            "expected a list of values",
                        ))
                    }
                };
                matrix.dimensions.insert(key.to_string(), axis);
            }
        }
    }

    Ok(matrix)
}

fn parse_step(value: &Value, path: &str) -> ParseResult<Step> {
    let map = value
        .as_mapping()
        .ok_or_else(|| DefinitionError::invalid(path, "expected a mapping"))?;

    Ok(Step {
        name: optional_string(map, "name", path)?,
        uses: optional_string(map, "uses", path)?,
        run: optional_string(map, "run", path)?,
        shell: optional_string(map, "shell", path)?,
        env: match map.get("env") {
            Some(v) => string_map(v, &format!("{}.env", path))?,
            None => IndexMap::new(),
        },
        if_condition: map.get("if").and_then(scalar_to_string),
    })
}

fn optional_string(map: &Mapping, key: &str, path: &str) -> ParseResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| DefinitionError::invalid(format!("{}.{}", path, key), "expected a string")),
    }
}

/// Mapping of names to display strings, in source order.
fn string_map(value: &Value, path: &str) -> ParseResult<IndexMap<String, String>> {
    match value {
        Value::Null => Ok(IndexMap::new()),
        Value::Mapping(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, value) in map {
                let key = scalar_to_string(key)
                    .ok_or_else(|| DefinitionError::invalid(path, "keys must be strings"))?;
                let value = scalar_to_string(value).unwrap_or_else(|| value_to_display(value));
                out.insert(key, value);
            }
            Ok(out)
        }
        // e.g. `env: ${{ fromJson(...) }}`
        Value::String(expr) => {
            let mut out = IndexMap::new();
            out.insert("(expression)".to_string(), expr.clone());
            Ok(out)
        }
        _ => Err(DefinitionError::invalid(path, "expected a mapping")),
    }
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::InputType;

    fn parse(yaml: &str) -> ParseResult<WorkflowDefinition> {
        parse_workflow(yaml, Path::new(".github/workflows/ci.yml"))
    }

    #[test]
    fn test_parse_simple_workflow() {
        let yaml = r#"
name: CI
on:
  push:
    branches: [main]
  pull_request:
env:
  RUST_LOG: debug
  CARGO_TERM_COLOR: always
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Build
        run: cargo build
  test:
    needs: build
    runs-on: [self-hosted, linux]
    steps:
      - run: cargo test
"#;
        let wf = parse(yaml).unwrap();
        assert_eq!(wf.name, "CI");
        assert_eq!(wf.file_stem, "ci");
        assert_eq!(wf.triggers.len(), 2);
        assert_eq!(wf.triggers[0].event, "push");
        assert!(wf.triggers[1].filters.is_empty());
        assert_eq!(
            wf.env.keys().collect::<Vec<_>>(),
            vec!["RUST_LOG", "CARGO_TERM_COLOR"]
        );
        assert_eq!(wf.jobs.len(), 2);
        assert_eq!(wf.jobs[1].needs, vec!["build"]);
        assert_eq!(wf.jobs[1].declaration_index, 1);
        assert_eq!(wf.jobs[1].runs_on.as_deref(), Some("self-hosted, linux"));
        assert_eq!(wf.jobs[0].steps[1].run.as_deref(), Some("cargo build"));
    }

    #[test]
    fn test_trigger_forms_normalize() {
        let string = parse("on: push\njobs:\n  a:\n    uses: ./x.yml\n").unwrap();
        let list = parse("on: [push]\njobs:\n  a:\n    uses: ./x.yml\n").unwrap();
        let map = parse("on:\n  push:\njobs:\n  a:\n    uses: ./x.yml\n").unwrap();
        assert_eq!(string.triggers, list.triggers);
        assert_eq!(list.triggers, map.triggers);
        assert_eq!(string.triggers, vec![Trigger::new("push")]);
    }

    #[test]
    fn test_schedule_trigger_collects_crons() {
        let yaml = "on:\n  schedule:\n    - cron: '0 2 * * *'\n    - cron: '0 14 * * 1'\njobs:\n  a:\n    uses: ./x.yml\n";
        let wf = parse(yaml).unwrap();
        let crons = &wf.triggers[0].filters["cron"];
        assert_eq!(value_to_display(crons), "0 2 * * *, 0 14 * * 1");
    }

    #[test]
    fn test_name_falls_back_to_file_stem() {
        let wf = parse("on: push\njobs:\n  a:\n    uses: ./x.yml\n").unwrap();
        assert_eq!(wf.name, "ci");
    }

    #[test]
    fn test_missing_sections() {
        let err = parse("name: x\njobs:\n  a:\n    uses: ./x.yml\n").unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::MissingSection);
        assert_eq!(err.path, "on");

        let err = parse("name: x\non: push\n").unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::MissingSection);
        assert_eq!(err.path, "jobs");
    }

    #[test]
    fn test_malformed_source() {
        let err = parse("name: [broken").unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::MalformedSource);

        let err = parse("").unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::MalformedSource);

        let err = parse("- just\n- a list\n").unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::MalformedSource);
    }

    #[test]
    fn test_duplicate_job_id() {
        let yaml = r#"
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps: [{run: make}]
  build:
    runs-on: ubuntu-latest
    steps: [{run: make again}]
"#;
        let err = parse(yaml).unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::DuplicateJobId);
        assert_eq!(err.path, "jobs.build");
    }

    #[test]
    fn test_invalid_needs_shape() {
        let yaml = "on: push\njobs:\n  a:\n    needs: 3\n    uses: ./x.yml\n";
        let err = parse(yaml).unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::InvalidField);
        assert_eq!(err.path, "jobs.a.needs");
    }

    #[test]
    fn test_job_without_steps_or_uses() {
        let yaml = "on: push\njobs:\n  empty:\n    runs-on: ubuntu-latest\n";
        let err = parse(yaml).unwrap_err();
        assert_eq!(err.kind, DefinitionErrorKind::InvalidField);
        assert_eq!(err.path, "jobs.empty");
    }

    #[test]
    fn test_inputs_from_dispatch_and_call() {
        let yaml = r#"
on:
  workflow_dispatch:
    inputs:
      environment:
        description: Target environment
        type: choice
        required: true
        options: [staging, production]
      retries:
        type: integer
        default: 3
  workflow_call:
    inputs:
      environment:
        type: string
      dry_run:
        type: boolean
        default: false
jobs:
  deploy:
    runs-on: ubuntu-latest
    steps: [{run: ./deploy.sh}]
"#;
        let wf = parse(yaml).unwrap();
        let names: Vec<_> = wf.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["environment", "retries", "dry_run"]);

        let env = &wf.inputs[0];
        assert_eq!(env.input_type, InputType::Choice);
        assert!(env.required);
        assert_eq!(env.options, vec!["staging", "production"]);
        assert_eq!(env.source, InputSource::WorkflowDispatch);

        let retries = &wf.inputs[1];
        assert_eq!(retries.input_type, InputType::Unknown("integer".into()));
        assert_eq!(retries.default.as_deref(), Some("3"));
        assert!(!retries.required);

        assert_eq!(wf.inputs[2].default.as_deref(), Some("false"));
        // inputs are not repeated as trigger filters
        assert!(wf.triggers[0].filters.is_empty());
    }

    #[test]
    fn test_annotation_does_not_override_yaml_description() {
        let yaml = r#"
# @input branch: Annotated description
# @required branch
on:
  workflow_dispatch:
    inputs:
      branch:
        description: Branch to deploy
        required: false
      tag:
        type: string
jobs:
  a:
    uses: ./x.yml
"#;
        let wf = parse(yaml).unwrap();
        let branch = &wf.inputs[0];
        assert_eq!(branch.description.as_deref(), Some("Branch to deploy"));
        assert!(!branch.required);
    }

    #[test]
    fn test_entry_description_annotation_does_not_override_yaml() {
        let yaml = r#"
on:
  workflow_dispatch:
    inputs:
      # @description: From annotation
      # @required: true
      target:
        description: From YAML
        required: false
jobs:
  a:
    uses: ./x.yml
"#;
        let wf = parse(yaml).unwrap();
        let target = &wf.inputs[0];
        assert_eq!(target.description.as_deref(), Some("From YAML"));
        assert!(!target.required);
    }

    #[test]
    fn test_annotation_fills_missing_input_fields() {
        let yaml = r#"
# @description: Release pipeline
on:
  workflow_dispatch:
    inputs:
      # @description: Version to release
      # @required: true
      version:
        type: string
jobs:
  a:
    uses: ./x.yml
"#;
        let wf = parse(yaml).unwrap();
        assert_eq!(wf.description.as_deref(), Some("Release pipeline"));
        let version = &wf.inputs[0];
        assert_eq!(version.description.as_deref(), Some("Version to release"));
        assert!(version.required);
    }

    #[test]
    fn test_reusable_call_job() {
        let yaml = r#"
on: push
jobs:
  call:
    uses: octo-org/shared/.github/workflows/deploy.yml@v1
    with:
      environment: production
    secrets: inherit
    if: github.ref == 'refs/heads/main'
"#;
        let wf = parse(yaml).unwrap();
        let job = &wf.jobs[0];
        assert!(job.is_reusable_call());
        assert!(job.is_conditional());
        assert_eq!(job.with["environment"], "production");
        assert_eq!(job.secrets.as_deref(), Some("inherit"));
        assert_eq!(
            wf.workflow_calls(),
            vec![("call", "octo-org/shared/.github/workflows/deploy.yml@v1")]
        );
    }

    #[test]
    fn test_matrix_strategy() {
        let yaml = r#"
on: push
jobs:
  test:
    runs-on: ${{ matrix.os }}
    strategy:
      fail-fast: false
      max-parallel: 2
      matrix:
        os: [ubuntu-latest, macos-latest]
        rust: [stable, beta, nightly]
        include:
          - os: windows-latest
            rust: stable
    steps: [{run: cargo test}]
"#;
        let wf = parse(yaml).unwrap();
        let strategy = wf.jobs[0].strategy.as_ref().unwrap();
        assert!(!strategy.fail_fast);
        assert_eq!(strategy.max_parallel, Some(2));
        let matrix = strategy.matrix.as_ref().unwrap();
        assert_eq!(matrix.combinations(), Some(6));
        assert_eq!(matrix.include, 1);
        assert!(wf.jobs[0].is_matrix());
    }

    #[test]
    fn test_concurrency_forms() {
        let wf = parse("on: push\nconcurrency: deploy\njobs:\n  a:\n    uses: ./x.yml\n").unwrap();
        assert_eq!(wf.concurrency.unwrap().group, "deploy");

        let yaml = "on: push\nconcurrency:\n  group: ci-${{ github.ref }}\n  cancel-in-progress: true\njobs:\n  a:\n    uses: ./x.yml\n";
        let c = parse(yaml).unwrap().concurrency.unwrap();
        assert_eq!(c.group, "ci-${{ github.ref }}");
        assert_eq!(c.cancel_in_progress.as_deref(), Some("true"));
    }

    #[test]
    fn test_yaml_anchors_are_merged_into_jobs() {
        let yaml = r#"
on: push
x-defaults: &defaults
  runs-on: ubuntu-latest
  steps: [{run: make}]
jobs:
  a:
    <<: *defaults
  b:
    <<: *defaults
    needs: a
"#;
        let wf = parse(yaml).unwrap();
        assert_eq!(wf.jobs[1].runs_on.as_deref(), Some("ubuntu-latest"));
        assert_eq!(wf.jobs[1].steps.len(), 1);
    }
}
