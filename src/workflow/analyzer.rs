//! Job dependency analysis.
//!
//! Turns a [`WorkflowDefinition`] into a [`DependencyGraph`]: one node per job,
//! one edge per `needs` entry (dependent -> dependency). The graph is validated
//! before it is returned, so downstream consumers never see dangling
//! references or cycles.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use serde::Serialize;

use super::types::{Job, WorkflowDefinition};
use crate::error::{AnalysisError, DanglingNeed};

/// Primary classification of a job.
///
/// When several apply, the first in `ReusableCall`, `Matrix`, `Conditional`
/// order wins. The individual flags are kept on [`GraphNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    Unconditional,
    Conditional,
    Matrix,
    ReusableCall,
}

impl NodeClass {
    fn of(job: &Job) -> Self {
        if job.is_reusable_call() {
            NodeClass::ReusableCall
        } else if job.is_matrix() {
            NodeClass::Matrix
        } else if job.is_conditional() {
            NodeClass::Conditional
        } else {
            NodeClass::Unconditional
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeClass::Unconditional => "unconditional",
            NodeClass::Conditional => "conditional",
            NodeClass::Matrix => "matrix",
            NodeClass::ReusableCall => "reusable-call",
        }
    }
}

/// A job in the dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub declaration_index: usize,
    /// Direct dependencies, in declared order.
    pub needs: Vec<String>,
    pub class: NodeClass,
    pub conditional: bool,
    pub matrix: bool,
    pub reusable_call: bool,
    /// Reusable workflow reference, for reusable calls.
    pub uses: Option<String>,
    /// Number of jobs that directly depend on this one.
    pub fan_out: usize,
    /// Length of the longest dependency chain leading to this job.
    pub level: usize,
}

/// A call to a reusable workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowCall {
    pub job_id: String,
    pub workflow: String,
    pub condition: Option<String>,
}

/// Matrix combinations for one job. `None` when computed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixUsage {
    pub job_id: String,
    pub dimensions: Vec<String>,
    pub combinations: Option<usize>,
}

/// Size and shape metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Complexity {
    pub jobs: usize,
    pub steps: usize,
    pub avg_dependencies: f64,
    /// Number of execution levels.
    pub max_chain_length: usize,
    pub score: f64,
}

/// Validated job dependency graph for one workflow.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    /// Nodes in declaration order.
    nodes: Vec<GraphNode>,
    /// Node ids, dependencies first; ties broken by declaration order.
    order: Vec<String>,
    /// Jobs grouped by level, each level in declaration order.
    levels: Vec<Vec<String>>,
    pub calls: Vec<WorkflowCall>,
    pub matrices: Vec<MatrixUsage>,
    /// Action name -> number of steps using it, in order of first use.
    pub action_usage: IndexMap<String, usize>,
    /// `secrets.*` names referenced in expressions, in order of first use.
    pub secret_refs: Vec<String>,
    /// `env.*` names referenced in expressions, in order of first use.
    pub env_refs: Vec<String>,
    pub complexity: Complexity,
}

impl DependencyGraph {
    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Job ids with every dependency before its dependents.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Nodes in topological order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.order.iter().filter_map(|id| self.node(id))
    }

    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Edges as `(dependent, dependency)` pairs, by dependent declaration
    /// order and then by `needs` order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|n| n.needs.iter().map(move |dep| (n.id.as_str(), dep.as_str())))
            .collect()
    }

    /// Ids of the jobs that directly depend on `id`, in declaration order.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.needs.iter().any(|d| d == id))
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Total matrix combinations across jobs with a static matrix.
    pub fn total_matrix_combinations(&self) -> usize {
        self.matrices.iter().filter_map(|m| m.combinations).sum()
    }

    /// Execution flow as a text tree, one line per level.
    ///
    /// ```text
    /// lint | test
    ///   └─► build
    ///     └─► deploy
    /// ```
    pub fn flow_text(&self) -> String {
        self.levels
            .iter()
            .enumerate()
            .map(|(depth, level)| {
                if depth == 0 {
                    level.join(" | ")
                } else {
                    format!("{}└─► {}", "  ".repeat(depth), level.join(" | "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Analyze the job structure of a workflow.
pub fn analyze(workflow: &WorkflowDefinition) -> Result<DependencyGraph, AnalysisError> {
    let ids: HashSet<&str> = workflow.jobs.iter().map(|j| j.id.as_str()).collect();

    let dangling: Vec<DanglingNeed> = workflow
        .jobs
        .iter()
        .flat_map(|job| {
            job.needs
                .iter()
                .filter(|dep| !ids.contains(dep.as_str()))
                .map(|dep| DanglingNeed {
                    job: job.id.clone(),
                    missing: dep.clone(),
                })
        })
        .collect();
    if !dangling.is_empty() {
        return Err(AnalysisError::UnknownDependency { dangling });
    }

    if let Some(cycle) = find_cycle(&workflow.jobs) {
        return Err(AnalysisError::CyclicDependency { cycle });
    }

    let order = topological_order(&workflow.jobs);

    let mut level_of: HashMap<&str, usize> = HashMap::new();
    for id in &order {
        let level = workflow
            .get_job(id)
            .map(|job| {
                job.needs
                    .iter()
                    .filter_map(|dep| level_of.get(dep.as_str()))
                    .map(|l| l + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        level_of.insert(id.as_str(), level);
    }

    let nodes: Vec<GraphNode> = workflow
        .jobs
        .iter()
        .map(|job| GraphNode {
            id: job.id.clone(),
            name: job.name.clone(),
            declaration_index: job.declaration_index,
            needs: job.needs.clone(),
            class: NodeClass::of(job),
            conditional: job.is_conditional(),
            matrix: job.is_matrix(),
            reusable_call: job.is_reusable_call(),
            uses: job.uses.clone(),
            fan_out: workflow
                .jobs
                .iter()
                .filter(|other| other.needs.contains(&job.id))
                .count(),
            level: level_of.get(job.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    let depth = nodes.iter().map(|n| n.level + 1).max().unwrap_or(0);
    let mut levels: Vec<Vec<String>> = vec![Vec::new(); depth];
    for node in &nodes {
        levels[node.level].push(node.id.clone());
    }

    let calls = workflow
        .jobs
        .iter()
        .filter_map(|job| {
            job.uses.as_ref().map(|uses| WorkflowCall {
                job_id: job.id.clone(),
                workflow: uses.clone(),
                condition: job.if_condition.clone(),
            })
        })
        .collect();

    let matrices = workflow
        .jobs
        .iter()
        .filter_map(|job| {
            let matrix = job.strategy.as_ref()?.matrix.as_ref()?;
            Some(MatrixUsage {
                job_id: job.id.clone(),
                dimensions: matrix.dimensions.keys().cloned().collect(),
                combinations: matrix.combinations(),
            })
        })
        .collect();

    let mut action_usage: IndexMap<String, usize> = IndexMap::new();
    for step in workflow.jobs.iter().flat_map(|j| j.steps.iter()) {
        if let Some(action) = step.action() {
            *action_usage.entry(action.to_string()).or_insert(0) += 1;
        }
    }

    let complexity = complexity(workflow, levels.len());

    Ok(DependencyGraph {
        nodes,
        order,
        levels,
        calls,
        matrices,
        action_usage,
        secret_refs: context_refs(&workflow.raw, "secrets"),
        env_refs: context_refs(&workflow.raw, "env"),
        complexity,
    })
}

/// Depth-first search in declaration order. Returns the first cycle found,
/// with its starting job repeated at the end.
fn find_cycle(jobs: &[Job]) -> Option<Vec<String>> {
    let deps: HashMap<&str, &[String]> = jobs
        .iter()
        .map(|j| (j.id.as_str(), j.needs.as_slice()))
        .collect();

    fn dfs<'a>(
        node: &'a str,
        deps: &HashMap<&'a str, &'a [String]>,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        stack.push(node);

        if let Some(neighbors) = deps.get(node) {
            for neighbor in neighbors.iter() {
                let neighbor = neighbor.as_str();
                if let Some(pos) = stack.iter().position(|n| *n == neighbor) {
                    let mut cycle: Vec<String> =
                        stack[pos..].iter().map(|s| s.to_string()).collect();
                    cycle.push(neighbor.to_string());
                    return Some(cycle);
                }
                if !visited.contains(neighbor) {
                    if let Some(cycle) = dfs(neighbor, deps, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        None
    }

    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    for job in jobs {
        if !visited.contains(job.id.as_str()) {
            if let Some(cycle) = dfs(&job.id, &deps, &mut visited, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Kahn's algorithm; among ready jobs the earliest declared goes first.
///
/// Callers must have ruled out cycles and dangling references.
fn topological_order(jobs: &[Job]) -> Vec<String> {
    let index_of: HashMap<&str, usize> = jobs
        .iter()
        .enumerate()
        .map(|(i, j)| (j.id.as_str(), i))
        .collect();

    let mut pending: Vec<usize> = jobs.iter().map(|j| j.needs.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
    for (i, job) in jobs.iter().enumerate() {
        for dep in &job.needs {
            if let Some(&d) = index_of.get(dep.as_str()) {
                dependents[d].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(jobs.len());
    while let Some(i) = ready.pop_first() {
        order.push(jobs[i].id.clone());
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.insert(d);
            }
        }
    }
    order
}

fn complexity(workflow: &WorkflowDefinition, chain: usize) -> Complexity {
    let jobs = workflow.jobs.len();
    let steps = workflow.total_steps();
    let dependencies: usize = workflow.jobs.iter().map(|j| j.needs.len()).sum();
    let avg_dependencies = dependencies as f64 / jobs.max(1) as f64;
    Complexity {
        jobs,
        steps,
        avg_dependencies,
        max_chain_length: chain,
        score: jobs as f64 * 0.5 + steps as f64 * 0.3 + avg_dependencies * 2.0 + chain as f64 * 1.5,
    }
}

fn expression_regex() -> &'static Regex {
    static EXPRESSION_REGEX: OnceLock<Regex> = OnceLock::new();
    EXPRESSION_REGEX.get_or_init(|| Regex::new(r"\$\{\{(.*?)\}\}").expect("valid regex"))
}

fn context_ref_regex() -> &'static Regex {
    static CONTEXT_REF_REGEX: OnceLock<Regex> = OnceLock::new();
    CONTEXT_REF_REGEX.get_or_init(|| {
        Regex::new(r"(^|[^A-Za-z0-9_.])([a-z]+)\.([A-Za-z_][A-Za-z0-9_-]*)").expect("valid regex")
    })
}

/// Names referenced as `<context>.NAME` inside `${{ }}` expressions.
fn context_refs(raw: &str, context: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for expr in expression_regex().captures_iter(raw) {
        let Some(body) = expr.get(1) else { continue };
        for caps in context_ref_regex().captures_iter(body.as_str()) {
            if caps.get(2).map(|m| m.as_str()) != Some(context) {
                continue;
            }
            if let Some(name) = caps.get(3) {
                let name = name.as_str().to_string();
                if !refs.contains(&name) {
                    refs.push(name);
                }
            }
        }
    }
    refs
}
