//! Index page for a documentation run.

use std::path::Path;

use super::{Block, Document, Inline, OutputFormat, Spans, NOT_AVAILABLE};
use crate::workflow::CallGraph;

/// Build the index document: every workflow with a link to its page, plus
/// the cross-workflow call graph.
pub fn assemble_index(graph: &CallGraph, workspace: &Path, format: OutputFormat) -> Document {
    let mut doc = Document::new("GitHub Actions Workflows");
    doc.push(Block::heading(1, "GitHub Actions Workflows"));

    doc.push(Block::heading(2, "Workflows"));
    let rows = graph
        .files()
        .map(|file| {
            let callees: Vec<String> = graph
                .callees(file)
                .iter()
                .map(|c| display(c, workspace))
                .collect();
            let callers: Vec<String> = graph
                .callers(file)
                .into_iter()
                .map(|c| display(c, workspace))
                .collect();
            vec![
                vec![Inline::link(stem(file), doc_link(file, format))],
                vec![Inline::code(display(file, workspace))],
                joined(&callees),
                joined(&callers),
            ]
        })
        .collect();
    doc.push(Block::Table {
        headers: ["Workflow", "File", "Calls", "Called By"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows,
    });

    let roots = graph.roots();
    if !roots.is_empty() {
        doc.push(Block::heading(2, "Call Graph"));
        for root in roots {
            doc.push(Block::code(None, graph.to_text(root)));
        }
    }

    let orphans = graph.orphans();
    if !orphans.is_empty() {
        doc.push(Block::heading(2, "Standalone Workflows"));
        doc.push(Block::List {
            ordered: false,
            items: orphans
                .into_iter()
                .map(|file| vec![Inline::link(stem(file), doc_link(file, format))])
                .collect(),
        });
    }

    let external: Vec<(&Path, &String)> = graph
        .files()
        .flat_map(|file| graph.external_calls(file).iter().map(move |r| (file, r)))
        .collect();
    if !external.is_empty() {
        doc.push(Block::heading(2, "External Workflow Calls"));
        doc.push(Block::Table {
            headers: vec!["Workflow".to_string(), "Reference".to_string()],
            rows: external
                .into_iter()
                .map(|(file, reference)| {
                    vec![
                        vec![Inline::code(display(file, workspace))],
                        vec![Inline::code(reference.clone())],
                    ]
                })
                .collect(),
        });
    }

    doc
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn doc_link(path: &Path, format: OutputFormat) -> String {
    format!("{}.{}", stem(path), format.extension())
}

fn display(path: &Path, workspace: &Path) -> String {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn joined(items: &[String]) -> Spans {
    if items.is_empty() {
        vec![Inline::text(NOT_AVAILABLE)]
    } else {
        vec![Inline::text(items.join(", "))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::render_markdown;
    use std::path::PathBuf;

    fn graph() -> CallGraph {
        let mut graph = CallGraph::new();
        graph.add_workflow(
            Path::new("/ws/.github/workflows/release.yml"),
            vec![PathBuf::from("/ws/.github/workflows/build.yml")],
        );
        graph.add_workflow(Path::new("/ws/.github/workflows/build.yml"), Vec::new());
        graph.add_workflow(Path::new("/ws/.github/workflows/lint.yml"), Vec::new());
        graph
    }

    #[test]
    fn test_index_lists_every_workflow() {
        let doc = assemble_index(&graph(), Path::new("/ws"), OutputFormat::Markdown);
        let md = render_markdown(&doc);
        assert!(md.contains(
            "| [release](release.md) | `.github/workflows/release.yml` | .github/workflows/build.yml | N/A |"
        ));
        assert!(md.contains(
            "| [build](build.md) | `.github/workflows/build.yml` | N/A | .github/workflows/release.yml |"
        ));
        assert!(md.contains("```\nrelease.yml\n  └─ build.yml\n```"));
        assert!(md.contains("## Standalone Workflows\n\n- [lint](lint.md)"));
    }

    #[test]
    fn test_index_links_follow_format() {
        let doc = assemble_index(&graph(), Path::new("/ws"), OutputFormat::Html);
        let md = render_markdown(&doc);
        assert!(md.contains("[lint](lint.html)"));
        assert!(!md.contains("External Workflow Calls"));
    }
}
