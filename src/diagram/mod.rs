//! Dependency diagrams.
//!
//! [`render`] turns a [`DependencyGraph`] into a declarative
//! [`DiagramDescription`]: node, edge and cluster primitives with style hints.
//! Encoders ([`to_mermaid`]) and image renderers ([`ImageRenderer`]) consume the
//! description; nothing here knows about a particular output format.

mod image;
mod mermaid;

use serde::{Deserialize, Serialize};

use crate::workflow::{DependencyGraph, GraphNode, NodeClass};

pub use image::{ImageFormat, ImageRenderer, MermaidCli};
pub use mermaid::to_mermaid;

/// Title of the cluster holding reusable workflow references.
pub const REUSABLE_CLUSTER_TITLE: &str = "Reusable Workflows";

const DEPLOY_KEYWORDS: &[&str] = &["deploy", "release", "publish", "prod"];

/// Cosmetic options for diagram rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    /// Nodes with at least this many direct dependents are emphasized.
    pub hub_threshold: usize,
    /// Mark terminal deploy/release/publish jobs.
    pub highlight_deployments: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            hub_threshold: 3,
            highlight_deployments: true,
        }
    }
}

/// Node shape, derived from the job classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Rectangle,
    Hexagon,
    Parallelogram,
    Subroutine,
}

impl From<NodeClass> for Shape {
    fn from(class: NodeClass) -> Self {
        match class {
            NodeClass::Unconditional => Shape::Rectangle,
            NodeClass::Conditional => Shape::Hexagon,
            NodeClass::Matrix => Shape::Parallelogram,
            NodeClass::ReusableCall => Shape::Subroutine,
        }
    }
}

/// Style hint attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Dashed,
    Emphasized,
    Deployment,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Dashed => "dashed",
            Style::Emphasized => "emphasized",
            Style::Deployment => "deployment",
        }
    }
}

/// One job in the diagram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramNode {
    /// Diagram-safe identifier, unique within the description.
    pub id: String,
    /// The job id this node stands for.
    pub job_id: String,
    pub label: String,
    pub shape: Shape,
    pub styles: Vec<Style>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `needs` dependency.
    Needs,
    /// Job calling a reusable workflow.
    Uses,
}

/// Directed edge. For `Needs` edges `from` is the dependent and `to` the
/// dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// A reference to an external (reusable) workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalRef {
    pub id: String,
    pub reference: String,
}

/// Group of external references, drawn apart from the job nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub id: String,
    pub title: String,
    pub members: Vec<ExternalRef>,
}

/// Declarative diagram of one workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramDescription {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    pub clusters: Vec<Cluster>,
}

impl DiagramDescription {
    pub fn node_for_job(&self, job_id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.job_id == job_id)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &DiagramEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

/// Build the diagram description for a graph.
pub fn render(graph: &DependencyGraph, options: &StyleOptions) -> DiagramDescription {
    let mut ids: Vec<String> = Vec::with_capacity(graph.nodes().len());
    for node in graph.nodes() {
        let id = unique_id(&format!("job_{}", sanitize(&node.id)), &ids);
        ids.push(id);
    }
    let id_of = |job_id: &str| -> String {
        graph
            .nodes()
            .iter()
            .position(|n| n.id == job_id)
            .map(|i| ids[i].clone())
            .unwrap_or_else(|| format!("job_{}", sanitize(job_id)))
    };

    let nodes = graph
        .nodes()
        .iter()
        .zip(&ids)
        .map(|(node, id)| DiagramNode {
            id: id.clone(),
            job_id: node.id.clone(),
            label: label(node),
            shape: node.class.into(),
            styles: styles(node, options),
        })
        .collect();

    let mut edges: Vec<DiagramEdge> = graph
        .edges()
        .into_iter()
        .map(|(dependent, dependency)| DiagramEdge {
            from: id_of(dependent),
            to: id_of(dependency),
            kind: EdgeKind::Needs,
        })
        .collect();

    let mut members: Vec<ExternalRef> = Vec::new();
    for call in &graph.calls {
        let target = match members.iter().find(|m| m.reference == call.workflow) {
            Some(existing) => existing.id.clone(),
            None => {
                let id = format!("wf{}", members.len());
                members.push(ExternalRef {
                    id: id.clone(),
                    reference: call.workflow.clone(),
                });
                id
            }
        };
        edges.push(DiagramEdge {
            from: id_of(&call.job_id),
            to: target,
            kind: EdgeKind::Uses,
        });
    }

    let clusters = if members.is_empty() {
        Vec::new()
    } else {
        vec![Cluster {
            id: "reusable_workflows".to_string(),
            title: REUSABLE_CLUSTER_TITLE.to_string(),
            members,
        }]
    };

    DiagramDescription {
        nodes,
        edges,
        clusters,
    }
}

fn label(node: &GraphNode) -> String {
    match node.class {
        NodeClass::ReusableCall => format!("{} (Reusable)", node.name),
        NodeClass::Matrix => format!("{} (Matrix)", node.name),
        _ => node.name.clone(),
    }
}

fn styles(node: &GraphNode, options: &StyleOptions) -> Vec<Style> {
    let mut styles = Vec::new();
    if node.conditional {
        styles.push(Style::Dashed);
    }
    if options.hub_threshold > 0 && node.fan_out >= options.hub_threshold {
        styles.push(Style::Emphasized);
    }
    if options.highlight_deployments && node.fan_out == 0 && is_deployment(node) {
        styles.push(Style::Deployment);
    }
    styles
}

fn is_deployment(node: &GraphNode) -> bool {
    let id = node.id.to_lowercase();
    let name = node.name.to_lowercase();
    DEPLOY_KEYWORDS
        .iter()
        .any(|k| id.contains(k) || name.contains(k))
}

/// Keep ASCII alphanumerics and `_`; everything else becomes `_`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn unique_id(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.iter().any(|t| t == candidate))
        .unwrap_or_else(|| base.to_string())
}
