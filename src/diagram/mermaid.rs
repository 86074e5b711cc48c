//! Mermaid flowchart encoder.

use std::fmt::Write;

use super::{DiagramDescription, EdgeKind, Shape, Style};

const STYLE_ORDER: [Style; 3] = [Style::Dashed, Style::Emphasized, Style::Deployment];

/// Serialize a diagram as a Mermaid `graph TD` flowchart.
///
/// Dependency edges are drawn in execution direction (dependency --> dependent).
/// The output depends only on the description, so identical descriptions give
/// byte-identical text.
pub fn to_mermaid(diagram: &DiagramDescription) -> String {
    let mut out = String::from("graph TD\n");

    for node in &diagram.nodes {
        let label = escape_label(&node.label);
        let shape = match node.shape {
            Shape::Rectangle => format!("[\"{}\"]", label),
            Shape::Hexagon => format!("{{{{\"{}\"}}}}", label),
            Shape::Parallelogram => format!("[/\"{}\"/]", label),
            Shape::Subroutine => format!("[[\"{}\"]]", label),
        };
        let _ = writeln!(out, "    {}{}", node.id, shape);
    }

    for edge in diagram.edges_of_kind(EdgeKind::Needs) {
        let _ = writeln!(out, "    {} --> {}", edge.to, edge.from);
    }

    for cluster in &diagram.clusters {
        let _ = writeln!(
            out,
            "    subgraph {}[\"{}\"]",
            cluster.id,
            escape_label(&cluster.title)
        );
        for member in &cluster.members {
            let _ = writeln!(
                out,
                "        {}[\"{}\"]",
                member.id,
                escape_label(&member.reference)
            );
        }
        out.push_str("    end\n");
    }

    for edge in diagram.edges_of_kind(EdgeKind::Uses) {
        let _ = writeln!(out, "    {} -. uses .-> {}", edge.from, edge.to);
    }

    for style in STYLE_ORDER {
        let members: Vec<&str> = diagram
            .nodes
            .iter()
            .filter(|n| n.styles.contains(&style))
            .map(|n| n.id.as_str())
            .collect();
        if members.is_empty() {
            continue;
        }
        let _ = writeln!(out, "    classDef {} {}", style.as_str(), class_def(style));
        let _ = writeln!(out, "    class {} {}", members.join(","), style.as_str());
    }

    out
}

fn class_def(style: Style) -> &'static str {
    match style {
        Style::Dashed => "fill:#f9f,stroke:#333,stroke-dasharray: 5 5",
        Style::Emphasized => "stroke:#0067b8,stroke-width:3px",
        Style::Deployment => "fill:#d4f4dd,stroke:#2e7d32,stroke-width:2px",
    }
}

/// Mermaid labels cannot contain raw double quotes.
fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}
