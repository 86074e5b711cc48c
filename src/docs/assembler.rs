//! Documentation assembly.
//!
//! Sections always appear in the same order:
//! header, diagram, triggers, inputs, environment, jobs, execution flow,
//! workflow source (opt-in), AI narrative (when available), related links.

use super::{Block, Document, Inline, Spans, NOT_AVAILABLE};
use crate::diagram::{to_mermaid, DiagramDescription};
use crate::narrative::Narrative;
use crate::workflow::{value_to_display, DependencyGraph, GraphNode, InputType, Job, WorkflowDefinition};

const ACTIONS_DOCS_URL: &str = "https://docs.github.com/en/actions";
const SYNTAX_DOCS_URL: &str =
    "https://docs.github.com/en/actions/using-workflows/workflow-syntax-for-github-actions";

/// Files produced next to the document for its diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramArtifact {
    /// Rendered image file name, when rendering succeeded.
    pub image: Option<String>,
    /// Mermaid source file name.
    pub source: Option<String>,
}

/// Assembly options.
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Append the raw workflow YAML.
    pub include_source: bool,
    pub diagram: DiagramArtifact,
}

/// Compose the documentation for one workflow.
pub fn assemble(
    workflow: &WorkflowDefinition,
    graph: &DependencyGraph,
    diagram: &DiagramDescription,
    narrative: Option<&Narrative>,
    options: &AssembleOptions,
) -> Document {
    let mut doc = Document::new(workflow.name.clone());
    doc.description = workflow.description.clone();

    header(&mut doc, workflow);
    diagram_section(&mut doc, diagram, &options.diagram);
    triggers(&mut doc, workflow);
    inputs(&mut doc, workflow);
    environment(&mut doc, workflow, graph);
    jobs(&mut doc, workflow, graph);

    doc.push(Block::heading(2, "Execution Flow"));
    doc.push(Block::code(None, graph.flow_text()));

    if options.include_source {
        doc.push(Block::heading(2, "Workflow Source"));
        doc.push(Block::code(Some("yaml"), workflow.raw.clone()));
    }

    if let Some(narrative) = narrative {
        if let Some(usage) = narrative.usage.as_deref() {
            doc.push(Block::heading(2, "AI-Generated Usage Information"));
            doc.push(Block::quote(usage));
        }
        if let Some(improvements) = narrative.improvements.as_deref() {
            doc.push(Block::heading(2, "AI-Generated Suggested Improvements"));
            doc.push(Block::quote(improvements));
        }
    }

    related_links(&mut doc, graph);
    doc
}

fn header(doc: &mut Document, workflow: &WorkflowDefinition) {
    doc.push(Block::heading(
        1,
        format!("GitHub Actions Workflow: {}", workflow.name),
    ));
    doc.push(Block::heading(2, "Overview"));

    let description = workflow
        .description
        .clone()
        .unwrap_or_else(|| format!("Documentation for {} workflow.", workflow.name));
    doc.push(Block::paragraph(vec![Inline::text(description)]));

    doc.push(labelled(
        "File Path",
        vec![Inline::code(workflow.source_path.display().to_string())],
    ));
    if let Some(author) = &workflow.author {
        doc.push(labelled("Author", vec![Inline::text(author.clone())]));
    }
    if let Some(version) = &workflow.version {
        doc.push(labelled("Version", vec![Inline::text(version.clone())]));
    }
    if let Some(concurrency) = &workflow.concurrency {
        let mut spans = vec![Inline::code(concurrency.group.clone())];
        if let Some(cancel) = &concurrency.cancel_in_progress {
            spans.push(Inline::text(" (cancel-in-progress: "));
            spans.push(Inline::code(cancel.clone()));
            spans.push(Inline::text(")"));
        }
        doc.push(labelled("Concurrency", spans));
    }
    if let Some(permissions) = &workflow.permissions {
        doc.push(labelled("Permissions", vec![Inline::code(permissions.clone())]));
    }
}

fn diagram_section(doc: &mut Document, diagram: &DiagramDescription, artifact: &DiagramArtifact) {
    doc.push(Block::heading(2, "Workflow Diagram"));
    if let Some(image) = &artifact.image {
        doc.push(Block::Image {
            src: image.clone(),
            alt: "Workflow Diagram".to_string(),
        });
    }
    doc.push(Block::code(Some("mermaid"), to_mermaid(diagram)));
    if let Some(source) = &artifact.source {
        doc.push(labelled(
            "Diagram Source",
            vec![Inline::link(source.clone(), source.clone())],
        ));
    }
}

fn triggers(doc: &mut Document, workflow: &WorkflowDefinition) {
    doc.push(Block::heading(2, "Triggers"));
    let rows = workflow
        .triggers
        .iter()
        .map(|trigger| {
            let conditions = if trigger.filters.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                trigger
                    .filters
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value_to_display(value)))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            vec![
                vec![Inline::code(trigger.event.clone())],
                vec![Inline::text(conditions)],
                vec![Inline::text(trigger.describe())],
            ]
        })
        .collect();
    doc.push(table(&["Event Type", "Conditions", "Description"], rows));
}

fn inputs(doc: &mut Document, workflow: &WorkflowDefinition) {
    if workflow.inputs.is_empty() {
        return;
    }
    doc.push(Block::heading(2, "Inputs"));
    let rows = workflow
        .inputs
        .iter()
        .map(|input| {
            let mut kind = vec![Inline::code(input.input_type.to_string())];
            if let InputType::Unknown(raw) = &input.input_type {
                kind.push(Inline::text(format!(" (declared as {})", raw)));
            }
            if !input.options.is_empty() {
                kind.push(Inline::text(format!(" ({})", input.options.join(", "))));
            }
            vec![
                vec![Inline::code(input.name.clone())],
                kind,
                vec![Inline::text(input.required.to_string())],
                optional_code(input.default.as_deref()),
                optional_text(input.description.as_deref()),
            ]
        })
        .collect();
    doc.push(table(
        &["Name", "Type", "Required", "Default", "Description"],
        rows,
    ));
}

fn environment(doc: &mut Document, workflow: &WorkflowDefinition, graph: &DependencyGraph) {
    let undeclared: Vec<&String> = graph
        .env_refs
        .iter()
        .filter(|name| !workflow.env.contains_key(name.as_str()))
        .collect();

    if workflow.env.is_empty() && undeclared.is_empty() && graph.secret_refs.is_empty() {
        return;
    }

    doc.push(Block::heading(2, "Environment Variables"));

    if !workflow.env.is_empty() || !undeclared.is_empty() {
        let mut rows: Vec<Vec<Spans>> = workflow
            .env
            .iter()
            .map(|(name, value)| {
                vec![
                    vec![Inline::code(name.clone())],
                    vec![Inline::text("Workflow")],
                    vec![Inline::code(value.clone())],
                    vec![Inline::text(NOT_AVAILABLE)],
                ]
            })
            .collect();
        rows.extend(undeclared.into_iter().map(|name| {
            vec![
                vec![Inline::code(name.clone())],
                vec![Inline::text("Set by user")],
                vec![Inline::text(NOT_AVAILABLE)],
                vec![Inline::text("Referenced in expressions")],
            ]
        }));
        doc.push(table(&["Name", "Source", "Value", "Description"], rows));
    }

    if !graph.secret_refs.is_empty() {
        doc.push(Block::heading(3, "Referenced Secrets"));
        let rows = graph
            .secret_refs
            .iter()
            .map(|name| {
                vec![
                    vec![Inline::code(name.clone())],
                    vec![Inline::text("Repository or organization secret")],
                ]
            })
            .collect();
        doc.push(table(&["Name", "Description"], rows));
    }
}

fn jobs(doc: &mut Document, workflow: &WorkflowDefinition, graph: &DependencyGraph) {
    doc.push(Block::heading(2, "Jobs"));

    let summary = graph
        .ordered_nodes()
        .map(|node| {
            let job = workflow.get_job(&node.id);
            vec![
                vec![Inline::code(node.id.clone())],
                vec![Inline::text(node.name.clone())],
                vec![Inline::text(node.class.as_str())],
                optional_code(job.and_then(|j| j.runs_on.as_deref())),
                needs_spans(node),
                vec![Inline::text(job.map_or(0, |j| j.steps.len()).to_string())],
            ]
        })
        .collect();
    doc.push(table(
        &["Job", "Name", "Type", "Runs On", "Depends On", "Steps"],
        summary,
    ));

    let complexity = &graph.complexity;
    doc.push(labelled(
        "Complexity",
        vec![Inline::text(format!(
            "{} jobs, {} steps, {:.1} dependencies per job, longest chain of {} jobs",
            complexity.jobs, complexity.steps, complexity.avg_dependencies, complexity.max_chain_length
        ))],
    ));

    if !graph.matrices.is_empty() {
        let total = graph.total_matrix_combinations();
        doc.push(labelled(
            "Matrix Combinations",
            vec![Inline::text(total.to_string())],
        ));
    }

    if !graph.action_usage.is_empty() {
        doc.push(labelled("Actions Used", Vec::new()));
        doc.push(Block::List {
            ordered: false,
            items: graph
                .action_usage
                .iter()
                .map(|(action, count)| {
                    vec![
                        Inline::code(action.clone()),
                        Inline::text(format!(
                            " ({} {})",
                            count,
                            if *count == 1 { "step" } else { "steps" }
                        )),
                    ]
                })
                .collect(),
        });
    }

    for node in graph.ordered_nodes() {
        if let Some(job) = workflow.get_job(&node.id) {
            job_detail(doc, job, node, graph);
        }
    }
}

fn job_detail(doc: &mut Document, job: &Job, node: &GraphNode, graph: &DependencyGraph) {
    doc.push(Block::heading(3, job.name.clone()));

    let summary = match &job.uses {
        Some(uses) => vec![
            Inline::text("Calls the "),
            Inline::code(uses.clone()),
            Inline::text(" reusable workflow."),
        ],
        None => vec![Inline::text(format!("{} job.", job.name))],
    };
    doc.push(Block::paragraph(summary));

    let mut rows: Vec<Vec<Spans>> = vec![
        property("Job ID", vec![Inline::code(job.id.clone())]),
        property("Type", vec![Inline::text(node.class.as_str())]),
        property("Runs On", optional_code(job.runs_on.as_deref())),
        property("Depends On", needs_spans(node)),
    ];

    let dependents = graph.dependents(&job.id);
    if !dependents.is_empty() {
        rows.push(property(
            "Required By",
            vec![Inline::text(dependents.join(", "))],
        ));
    }
    if let Some(condition) = &job.if_condition {
        rows.push(property("Condition", vec![Inline::code(condition.clone())]));
    }
    if let Some(uses) = &job.uses {
        rows.push(property("Uses Workflow", vec![Inline::code(uses.clone())]));
        if !job.with.is_empty() {
            let with = job
                .with
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            rows.push(property("With", vec![Inline::code(with)]));
        }
        if let Some(secrets) = &job.secrets {
            rows.push(property("Secrets", vec![Inline::code(secrets.clone())]));
        }
    }
    if let Some(strategy) = &job.strategy {
        if let Some(matrix) = &strategy.matrix {
            let combinations = matrix
                .combinations()
                .map(|n| format!(", {} combinations", n))
                .unwrap_or_default();
            rows.push(property(
                "Strategy",
                vec![
                    Inline::text("Matrix with "),
                    Inline::code(matrix.summary()),
                    Inline::text(format!("{}, fail-fast: {}", combinations, strategy.fail_fast)),
                ],
            ));
        } else {
            rows.push(property(
                "Strategy",
                vec![Inline::text(format!("fail-fast: {}", strategy.fail_fast))],
            ));
        }
        let max_parallel = strategy
            .max_parallel
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        rows.push(property("Max Parallel", vec![Inline::text(max_parallel)]));
    }
    if let Some(environment) = &job.environment {
        rows.push(property("Environment", vec![Inline::code(environment.clone())]));
    }
    if let Some(timeout) = &job.timeout_minutes {
        rows.push(property("Timeout (minutes)", vec![Inline::text(timeout.clone())]));
    }
    if let Some(permissions) = &job.permissions {
        rows.push(property("Permissions", vec![Inline::code(permissions.clone())]));
    }
    doc.push(table(&["Property", "Value"], rows));

    if !job.outputs.is_empty() {
        doc.push(labelled("Outputs", Vec::new()));
        doc.push(Block::List {
            ordered: false,
            items: job
                .outputs
                .iter()
                .map(|(name, expr)| {
                    vec![
                        Inline::code(name.clone()),
                        Inline::text(": "),
                        Inline::code(expr.clone()),
                    ]
                })
                .collect(),
        });
    }

    if !job.steps.is_empty() {
        doc.push(labelled("Steps", Vec::new()));
        doc.push(Block::List {
            ordered: true,
            items: job
                .steps
                .iter()
                .map(|step| vec![Inline::text(step.label())])
                .collect(),
        });
    }
}

fn related_links(doc: &mut Document, graph: &DependencyGraph) {
    doc.push(Block::heading(2, "Related Documentation"));

    let mut items = vec![
        vec![Inline::link("GitHub Actions Documentation", ACTIONS_DOCS_URL)],
        vec![Inline::link("Workflow Syntax Reference", SYNTAX_DOCS_URL)],
    ];

    let mut seen: Vec<&str> = Vec::new();
    for call in &graph.calls {
        if seen.contains(&call.workflow.as_str()) {
            continue;
        }
        seen.push(&call.workflow);
        let url = if call.workflow.starts_with("./") {
            call.workflow.clone()
        } else {
            format!("https://github.com/{}", call.workflow)
        };
        items.push(vec![Inline::link(call.workflow.clone(), url)]);
    }

    doc.push(Block::List {
        ordered: false,
        items,
    });
}

fn table(headers: &[&str], rows: Vec<Vec<Spans>>) -> Block {
    Block::Table {
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

fn property(name: &str, value: Spans) -> Vec<Spans> {
    vec![vec![Inline::strong(name)], value]
}

/// `**Label**: value` paragraph; a bare `**Label**:` introduces a list.
fn labelled(label: &str, mut value: Spans) -> Block {
    let mut spans = vec![Inline::strong(label), Inline::text(":")];
    if !value.is_empty() {
        spans.push(Inline::text(" "));
        spans.append(&mut value);
    }
    Block::paragraph(spans)
}

fn needs_spans(node: &GraphNode) -> Spans {
    if node.needs.is_empty() {
        vec![Inline::text(NOT_AVAILABLE)]
    } else {
        vec![Inline::text(node.needs.join(", "))]
    }
}

fn optional_code(value: Option<&str>) -> Spans {
    match value {
        Some(v) => vec![Inline::code(v)],
        None => vec![Inline::text(NOT_AVAILABLE)],
    }
}

fn optional_text(value: Option<&str>) -> Spans {
    vec![Inline::text(value.unwrap_or(NOT_AVAILABLE))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{render, StyleOptions};
    use crate::docs::{render_markdown, OutputFormat};
    use crate::workflow::{analyze, parse_workflow};
    use std::path::Path;

    const CI: &str = r#"# @description: Builds and ships the service
# @author: platform-team
name: CI
on:
  push:
    branches: [main]
  workflow_dispatch:
    inputs:
      dry_run:
        description: Skip the deploy
        type: boolean
        default: false
env:
  REGISTRY: ghcr.io
jobs:
  lint:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - run: make lint
  test:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - run: make test
  build:
    needs: [lint, test]
    runs-on: ubuntu-latest
    steps:
      - run: docker build -t ${{ env.REGISTRY }}/app .
  deploy:
    needs: build
    if: github.ref == 'refs/heads/main'
    runs-on: ubuntu-latest
    steps:
      - run: ./deploy.sh
        env:
          TOKEN: ${{ secrets.DEPLOY_TOKEN }}
"#;

    fn build(yaml: &str, narrative: Option<&Narrative>, options: &AssembleOptions) -> Document {
        let workflow = parse_workflow(yaml, Path::new(".github/workflows/ci.yml")).unwrap();
        let graph = analyze(&workflow).unwrap();
        let diagram = render(&graph, &StyleOptions::default());
        assemble(&workflow, &graph, &diagram, narrative, options)
    }

    #[test]
    fn test_section_order() {
        let doc = build(CI, None, &AssembleOptions::default());
        assert_eq!(
            doc.headings(2),
            vec![
                "Overview",
                "Workflow Diagram",
                "Triggers",
                "Inputs",
                "Environment Variables",
                "Jobs",
                "Execution Flow",
                "Related Documentation",
            ]
        );
        assert_eq!(doc.headings(1), vec!["GitHub Actions Workflow: CI"]);
    }

    #[test]
    fn test_job_details_in_topological_order() {
        let doc = build(CI, None, &AssembleOptions::default());
        let job_headings: Vec<&str> = doc
            .headings(3)
            .into_iter()
            .filter(|h| *h != "Referenced Secrets")
            .collect();
        assert_eq!(job_headings, vec!["lint", "test", "build", "deploy"]);

        let md = render_markdown(&doc);
        assert!(md.contains("| **Condition** | `github.ref == 'refs/heads/main'` |"));
        assert!(md.contains("| `deploy` | deploy | conditional |"));
        assert!(md.contains("```\nlint | test\n  └─► build\n    └─► deploy\n```"));
    }

    #[test]
    fn test_rows_per_declaration() {
        let md = render_markdown(&build(CI, None, &AssembleOptions::default()));
        assert!(md.contains("| `push` | branches: main | Triggered when code is pushed to the repository |"));
        assert!(md.contains("| `workflow_dispatch` | N/A | Manually triggered through the GitHub UI or API |"));
        assert!(md.contains("| `dry_run` | `boolean` | false | `false` | Skip the deploy |"));
        assert!(md.contains("| `REGISTRY` | Workflow | `ghcr.io` | N/A |"));
        assert!(md.contains("### Referenced Secrets"));
        assert!(md.contains("| `DEPLOY_TOKEN` |"));
        assert!(md.contains("**Author**: platform-team"));
    }

    #[test]
    fn test_optional_sections() {
        let plain = render_markdown(&build(CI, None, &AssembleOptions::default()));
        assert!(!plain.contains("## Workflow Source"));
        assert!(!plain.contains("AI-Generated"));

        let narrative = Narrative {
            usage: Some("Run it on push.".to_string()),
            improvements: None,
        };
        let options = AssembleOptions {
            include_source: true,
            diagram: DiagramArtifact {
                image: Some("ci-diagram.png".to_string()),
                source: Some("ci-diagram.mmd".to_string()),
            },
        };
        let doc = build(CI, Some(&narrative), &options);
        let headings = doc.headings(2);
        assert_eq!(
            &headings[6..],
            &[
                "Execution Flow",
                "Workflow Source",
                "AI-Generated Usage Information",
                "Related Documentation",
            ]
        );
        let md = render_markdown(&doc);
        assert!(md.contains("![Workflow Diagram](ci-diagram.png)"));
        assert!(md.contains("```yaml\n# @description: Builds and ships the service"));
        assert!(md.contains("> Run it on push."));
    }

    #[test]
    fn test_reusable_call_links() {
        let yaml = r#"
on: push
jobs:
  local:
    uses: ./.github/workflows/shared.yml
  remote:
    uses: octo/pipelines/.github/workflows/release.yml@v1
    secrets: inherit
"#;
        let md = render_markdown(&build(yaml, None, &AssembleOptions::default()));
        assert!(md.contains("- [./.github/workflows/shared.yml](./.github/workflows/shared.yml)"));
        assert!(md.contains(
            "- [octo/pipelines/.github/workflows/release.yml@v1](https://github.com/octo/pipelines/.github/workflows/release.yml@v1)"
        ));
        assert!(md.contains("| **Secrets** | `inherit` |"));
        assert!(!md.contains("## Inputs"));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let a = build(CI, None, &AssembleOptions::default());
        let b = build(CI, None, &AssembleOptions::default());
        assert_eq!(a, b);
        assert_eq!(
            a.render(OutputFormat::Html).unwrap(),
            b.render(OutputFormat::Html).unwrap()
        );
    }
}
