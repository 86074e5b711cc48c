//! Documentation model and renderers.
//!
//! The assembler builds a [`Document`], a flat list of typed blocks. The
//! Markdown and HTML renderers turn the same document into text, so both
//! formats always carry the same sections in the same order.

mod assembler;
mod html;
mod index;
mod markdown;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use assembler::{assemble, AssembleOptions, DiagramArtifact};
pub use html::render_html;
pub use index::assemble_index;
pub use markdown::render_markdown;

/// Placeholder for absent optional values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            other => Err(Error::Config(format!(
                "Unsupported output format '{}' (expected markdown or html)",
                other
            ))),
        }
    }
}

/// Inline text span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    Code { text: String },
    Strong { text: String },
    Link { text: String, url: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Inline::Code { text: text.into() }
    }

    pub fn strong(text: impl Into<String>) -> Self {
        Inline::Strong { text: text.into() }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Inline::Link {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// A run of inline spans (paragraph, list item, table cell).
pub type Spans = Vec<Inline>;

/// Document block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        spans: Spans,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<Spans>>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    List {
        ordered: bool,
        items: Vec<Spans>,
    },
    /// Free text quoted verbatim (e.g. generated narrative), split on blank lines.
    Quote {
        paragraphs: Vec<String>,
    },
    Image {
        src: String,
        alt: String,
    },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(spans: Spans) -> Self {
        Block::Paragraph { spans }
    }

    pub fn quote(text: &str) -> Self {
        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in text.trim().lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line.trim_end());
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join("\n"));
        }
        Block::Quote { paragraphs }
    }

    pub fn code(language: Option<&str>, code: impl Into<String>) -> Self {
        Block::CodeBlock {
            language: language.map(str::to_string),
            code: code.into(),
        }
    }
}

/// A rendered-format-independent document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub description: Option<String>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Text of all headings at `level`, in order.
    pub fn headings(&self, level: u8) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { level: l, text } if *l == level => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Render in the requested format.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Markdown => Ok(render_markdown(self)),
            OutputFormat::Html => render_html(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Html.extension(), "html");
    }

    #[test]
    fn test_headings() {
        let mut doc = Document::new("x");
        doc.push(Block::heading(1, "Title"));
        doc.push(Block::heading(2, "One"));
        doc.push(Block::paragraph(vec![Inline::text("body")]));
        doc.push(Block::heading(2, "Two"));
        assert_eq!(doc.headings(2), vec!["One", "Two"]);
    }
}
