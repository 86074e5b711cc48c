//! Markdown renderer.

use super::{Block, Document, Inline};

/// Render a document as GitHub-flavored Markdown.
pub fn render_markdown(doc: &Document) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(doc.blocks.len());

    for block in &doc.blocks {
        let rendered = match block {
            Block::Heading { level, text } => {
                format!("{} {}", "#".repeat((*level).clamp(1, 6) as usize), text)
            }
            Block::Paragraph { spans } => spans_to_markdown(spans),
            Block::Table { headers, rows } => table(headers, rows),
            Block::CodeBlock { language, code } => {
                let fence = fence_for(code);
                format!(
                    "{}{}\n{}\n{}",
                    fence,
                    language.as_deref().unwrap_or(""),
                    code.trim_end_matches('\n'),
                    fence
                )
            }
            Block::List { ordered, items } => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let marker = if *ordered {
                        format!("{}.", i + 1)
                    } else {
                        "-".to_string()
                    };
                    format!("{} {}", marker, spans_to_markdown(item))
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote { paragraphs } => paragraphs
                .iter()
                .map(|p| {
                    p.lines()
                        .map(|l| format!("> {}", l))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect::<Vec<_>>()
                .join("\n>\n"),
            Block::Image { src, alt } => format!("![{}]({})", alt, src),
        };
        parts.push(rendered);
    }

    let mut out = parts.join("\n\n");
    out.push('\n');
    out
}

fn table(headers: &[String], rows: &[Vec<Vec<Inline>>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!(
        "| {} |",
        headers
            .iter()
            .map(|h| escape_cell(h))
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    lines.push(format!(
        "|{}|",
        headers
            .iter()
            .map(|h| "-".repeat(h.chars().count().max(3) + 2))
            .collect::<Vec<_>>()
            .join("|")
    ));
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| escape_cell(&spans_to_markdown(cell)))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

fn spans_to_markdown(spans: &[Inline]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text { text } => text.clone(),
            Inline::Code { text } => code_span(text),
            Inline::Strong { text } => format!("**{}**", text),
            Inline::Link { text, url } => format!("[{}]({})", text, url),
        })
        .collect()
}

/// Backtick code span that survives backticks in its content.
fn code_span(text: &str) -> String {
    if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

/// Table cells cannot contain raw pipes or line breaks.
fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

/// A fence longer than any backtick run inside the code.
fn fence_for(code: &str) -> String {
    let longest = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_blocks() {
        let mut doc = Document::new("CI");
        doc.push(Block::heading(1, "CI"));
        doc.push(Block::paragraph(vec![
            Inline::strong("File Path"),
            Inline::text(": "),
            Inline::code(".github/workflows/ci.yml"),
        ]));
        doc.push(Block::List {
            ordered: true,
            items: vec![vec![Inline::text("one")], vec![Inline::text("two")]],
        });
        doc.push(Block::quote("First line\n\nSecond line"));

        let md = render_markdown(&doc);
        assert_eq!(
            md,
            "# CI\n\n**File Path**: `.github/workflows/ci.yml`\n\n1. one\n2. two\n\n> First line\n>\n> Second line\n"
        );
    }

    #[test]
    fn test_table_escapes_cells() {
        let mut doc = Document::new("t");
        doc.push(Block::Table {
            headers: vec!["Name".to_string(), "Value".to_string()],
            rows: vec![vec![
                vec![Inline::code("A")],
                vec![Inline::text("x | y\nz")],
            ]],
        });
        let md = render_markdown(&doc);
        assert_eq!(
            md,
            "| Name | Value |\n|------|-------|\n| `A` | x \\| y z |\n"
        );
    }

    #[test]
    fn test_code_fence_grows_with_content() {
        let mut doc = Document::new("t");
        doc.push(Block::code(Some("yaml"), "run: echo ```\n"));
        let md = render_markdown(&doc);
        assert!(md.starts_with("````yaml\nrun: echo ```\n````"));
    }
}
