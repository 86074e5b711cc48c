//! Cross-file workflow call graph.
//!
//! Links the discovered workflow files through their reusable-workflow jobs
//! (`uses: ./.github/workflows/x.yml`). Remote references
//! (`owner/repo/path@ref`) are kept per file but are not graph nodes.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use super::types::WorkflowDefinition;
use crate::error::AnalysisError;

/// Which local workflow files call which.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    /// Caller -> local callees, both normalized, in discovery order.
    calls: IndexMap<PathBuf, Vec<PathBuf>>,
    /// Caller -> references that do not resolve to a discovered file.
    external: IndexMap<PathBuf, Vec<String>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of parsed workflows.
    ///
    /// A `./` reference resolves against the workspace root first, then
    /// against the calling file's directory.
    pub fn build(workflows: &[WorkflowDefinition], workspace: &Path) -> Self {
        let known: HashSet<PathBuf> = workflows
            .iter()
            .map(|w| normalize(&w.source_path))
            .collect();

        let mut graph = Self::new();
        for workflow in workflows {
            let caller = normalize(&workflow.source_path);
            let mut local = Vec::new();
            let mut external = Vec::new();

            for (_, reference) in workflow.workflow_calls() {
                match resolve_local(reference, &caller, workspace, &known) {
                    Some(callee) => {
                        if !local.contains(&callee) {
                            local.push(callee);
                        }
                    }
                    None => external.push(reference.to_string()),
                }
            }

            graph.add_workflow(&caller, local);
            if !external.is_empty() {
                graph.external.insert(caller, external);
            }
        }
        graph
    }

    /// Add a workflow file with the local files it calls.
    pub fn add_workflow(&mut self, path: &Path, callees: Vec<PathBuf>) {
        self.calls.insert(path.to_path_buf(), callees);
    }

    /// Workflow files in insertion order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.calls.keys().map(PathBuf::as_path)
    }

    pub fn callees(&self, path: &Path) -> &[PathBuf] {
        self.calls.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files that call `path`, in insertion order.
    pub fn callers(&self, path: &Path) -> Vec<&Path> {
        self.calls
            .iter()
            .filter(|(_, callees)| callees.iter().any(|c| c == path))
            .map(|(caller, _)| caller.as_path())
            .collect()
    }

    /// Remote references made by `path`.
    pub fn external_calls(&self, path: &Path) -> &[String] {
        self.external.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files that call other local files but are not called themselves.
    pub fn roots(&self) -> Vec<&Path> {
        self.files()
            .filter(|f| self.callers(f).is_empty() && !self.callees(f).is_empty())
            .collect()
    }

    /// Files that neither call nor are called by another local file.
    pub fn orphans(&self) -> Vec<&Path> {
        self.files()
            .filter(|f| self.callers(f).is_empty() && self.callees(f).is_empty())
            .collect()
    }

    /// Every file reachable from `root` through calls, excluding `root`.
    pub fn collect_all_called(&self, root: &Path) -> Vec<&Path> {
        let mut seen: Vec<&Path> = Vec::new();
        let mut stack: Vec<&Path> = self.callees(root).iter().rev().map(PathBuf::as_path).collect();
        while let Some(next) = stack.pop() {
            if next == root || seen.contains(&next) {
                continue;
            }
            seen.push(next);
            stack.extend(self.callees(next).iter().rev().map(PathBuf::as_path));
        }
        seen
    }

    /// Check that no workflow calls itself, directly or indirectly.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for file in self.files() {
            if !visited.contains(file) {
                if let Some(cycle) = self.find_cycle(file, &mut visited, &mut stack) {
                    return Err(AnalysisError::CyclicDependency { cycle });
                }
            }
        }
        Ok(())
    }

    fn find_cycle<'a>(
        &'a self,
        node: &'a Path,
        visited: &mut HashSet<&'a Path>,
        stack: &mut Vec<&'a Path>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        stack.push(node);

        for callee in self.callees(node) {
            let callee = callee.as_path();
            if let Some(pos) = stack.iter().position(|n| *n == callee) {
                let mut cycle: Vec<String> = stack[pos..]
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                cycle.push(callee.display().to_string());
                return Some(cycle);
            }
            if !visited.contains(callee) {
                if let Some(cycle) = self.find_cycle(callee, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        None
    }

    /// Text tree of the calls made from `root`.
    pub fn to_text(&self, root: &Path) -> String {
        let mut lines = Vec::new();
        let mut visited = HashSet::new();

        self.format_node(root, 0, &mut visited, &mut lines);

        lines.join("\n")
    }

    fn format_node<'a>(
        &'a self,
        node: &'a Path,
        depth: usize,
        visited: &mut HashSet<&'a Path>,
        lines: &mut Vec<String>,
    ) {
        let indent = "  ".repeat(depth);
        let marker = if depth == 0 { "" } else { "└─ " };
        let label = node
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| node.display().to_string());

        if !visited.insert(node) {
            lines.push(format!("{}{}{}  (already shown)", indent, marker, label));
            return;
        }

        lines.push(format!("{}{}{}", indent, marker, label));

        for callee in self.callees(node) {
            self.format_node(callee, depth + 1, visited, lines);
        }
    }
}

fn resolve_local(
    reference: &str,
    caller: &Path,
    workspace: &Path,
    known: &HashSet<PathBuf>,
) -> Option<PathBuf> {
    let relative = reference.strip_prefix("./")?;
    let relative = relative.split('@').next().unwrap_or(relative);

    let mut candidates = vec![normalize(&workspace.join(relative))];
    if let Some(dir) = caller.parent() {
        candidates.push(normalize(&dir.join(relative)));
    }
    candidates.into_iter().find(|c| known.contains(c))
}

/// Lexically normalize a path (drop `.`, fold `..`).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::parse_workflow;

    fn wf(path: &str, yaml: &str) -> WorkflowDefinition {
        parse_workflow(yaml, Path::new(path)).unwrap()
    }

    fn repo() -> Vec<WorkflowDefinition> {
        vec![
            wf(
                "/repo/.github/workflows/root.yml",
                "on: push\njobs:\n  call_mid:\n    uses: ./.github/workflows/mid.yml\n",
            ),
            wf(
                "/repo/.github/workflows/mid.yml",
                "on: workflow_call\njobs:\n  call_leaf:\n    uses: ./leaf.yml\n  remote:\n    uses: octo/shared/.github/workflows/lint.yml@v2\n",
            ),
            wf(
                "/repo/.github/workflows/leaf.yml",
                "on: workflow_call\njobs:\n  run:\n    steps: [{run: make}]\n",
            ),
            wf(
                "/repo/.github/workflows/lonely.yml",
                "on: push\njobs:\n  run:\n    steps: [{run: make}]\n",
            ),
        ]
    }

    #[test]
    fn test_roots_and_orphans() {
        let graph = CallGraph::build(&repo(), Path::new("/repo"));
        assert_eq!(
            graph.roots(),
            vec![Path::new("/repo/.github/workflows/root.yml")]
        );
        assert_eq!(
            graph.orphans(),
            vec![Path::new("/repo/.github/workflows/lonely.yml")]
        );
        assert_eq!(
            graph.external_calls(Path::new("/repo/.github/workflows/mid.yml")),
            &["octo/shared/.github/workflows/lint.yml@v2".to_string()]
        );
    }

    #[test]
    fn test_collect_all_called() {
        let graph = CallGraph::build(&repo(), Path::new("/repo"));
        let called = graph.collect_all_called(Path::new("/repo/.github/workflows/root.yml"));
        assert_eq!(
            called,
            vec![
                Path::new("/repo/.github/workflows/mid.yml"),
                Path::new("/repo/.github/workflows/leaf.yml"),
            ]
        );
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_call_cycle() {
        let mut graph = CallGraph::new();
        graph.add_workflow(Path::new("a.yml"), vec![PathBuf::from("b.yml")]);
        graph.add_workflow(Path::new("b.yml"), vec![PathBuf::from("a.yml")]);
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("a.yml -> b.yml -> a.yml"));
    }

    #[test]
    fn test_call_tree_text() {
        let mut graph = CallGraph::new();
        graph.add_workflow(
            Path::new("main.yml"),
            vec![PathBuf::from("one.yml"), PathBuf::from("two.yml")],
        );
        graph.add_workflow(Path::new("one.yml"), vec![PathBuf::from("two.yml")]);
        graph.add_workflow(Path::new("two.yml"), vec![]);

        let text = graph.to_text(Path::new("main.yml"));
        assert_eq!(
            text,
            "main.yml\n  └─ one.yml\n    └─ two.yml\n  └─ two.yml  (already shown)"
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/repo/./.github/workflows/../x.yml")),
            PathBuf::from("/repo/.github/x.yml")
        );
    }
}
