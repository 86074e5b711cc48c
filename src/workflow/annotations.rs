//! Documentation annotations embedded in workflow comments.
//!
//! Annotations are comment lines of the form `# @key: value`. They only fill
//! gaps: the parser never lets an annotation replace a value the YAML declares.
//!
//! ```yaml
//! # @description: Build and publish the container image
//! # @author: platform-team
//! # @version: 2.1
//! # @input image_tag: Tag to publish
//! # @required image_tag
//! name: Publish
//! on:
//!   workflow_dispatch:
//!     inputs:
//!       # @description: Registry to push to
//!       # @required: true
//!       registry:
//!         type: string
//! ```

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex_lite::Regex;

/// Annotations for a single input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputAnnotation {
    pub description: Option<String>,
    pub required: Option<bool>,
}

/// All annotations found in a workflow source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub inputs: IndexMap<String, InputAnnotation>,
}

/// One `@key [target]: value` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    key: String,
    target: Option<String>,
    value: String,
}

/// Tracks the `inputs:` block currently being scanned.
struct InputsBlock {
    indent: usize,
    entry_indent: Option<usize>,
}

/// Extract annotations from raw workflow text.
pub fn extract_annotations(raw: &str) -> Annotations {
    let marker_re = marker_regex();
    let key_re = key_regex();

    let mut annotations = Annotations::default();
    let mut pending: Vec<Marker> = Vec::new();
    let mut in_header = true;
    let mut inputs_block: Option<InputsBlock> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('#') {
            if let Some(marker) = parse_marker(marker_re, line) {
                if in_header {
                    apply_workflow_marker(&mut annotations, &marker);
                } else if marker.target.is_some() {
                    apply_targeted_marker(&mut annotations, &marker);
                } else {
                    pending.push(marker);
                }
            }
            continue;
        }

        in_header = false;
        let indent = line.len() - line.trim_start().len();
        let key = key_re
            .captures(line)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().trim_matches(|c| c == '\'' || c == '"').to_string());

        if let Some(block) = &inputs_block {
            if indent <= block.indent {
                inputs_block = None;
            }
        }

        let markers = std::mem::take(&mut pending);

        if let (Some(block), Some(key)) = (inputs_block.as_mut(), key.as_deref()) {
            let entry_indent = *block.entry_indent.get_or_insert(indent);
            if indent == entry_indent {
                let entry = annotations.inputs.entry(key.to_string()).or_default();
                for marker in &markers {
                    apply_input_marker(entry, marker);
                }
                continue;
            }
        }

        if indent == 0 && key.as_deref() == Some("name") {
            for marker in &markers {
                apply_workflow_marker(&mut annotations, marker);
            }
        }

        if key.as_deref() == Some("inputs") && line.trim_end().ends_with(':') {
            inputs_block = Some(InputsBlock {
                indent,
                entry_indent: None,
            });
        }
    }

    annotations.inputs.retain(|_, a| a != &InputAnnotation::default());
    annotations
}

fn marker_regex() -> &'static Regex {
    static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    MARKER_REGEX.get_or_init(|| Regex::new(r"^\s*#\s*@([A-Za-z_]+)(.*)$").expect("valid regex"))
}

fn key_regex() -> &'static Regex {
    static KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    KEY_REGEX.get_or_init(|| {
        Regex::new(r#"^(\s*)([A-Za-z0-9_.-]+|'[^']*'|"[^"]*")\s*:(\s|$)"#).expect("valid regex")
    })
}

fn parse_marker(re: &Regex, line: &str) -> Option<Marker> {
    let caps = re.captures(line)?;
    let key = caps.get(1)?.as_str().to_lowercase();
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("").trim();

    let (target, value) = if let Some(value) = rest.strip_prefix(':') {
        (None, value.trim())
    } else if let Some((target, value)) = rest.split_once(':') {
        (Some(target.trim()), value.trim())
    } else if rest.is_empty() {
        (None, "")
    } else if matches!(key.as_str(), "description" | "author" | "version") {
        // `@description Builds the site`: no colon, so the rest is the value.
        (None, rest)
    } else {
        (Some(rest), "")
    };

    Some(Marker {
        key,
        target: target.filter(|t| !t.is_empty()).map(str::to_string),
        value: value.to_string(),
    })
}

fn apply_workflow_marker(annotations: &mut Annotations, marker: &Marker) {
    if marker.target.is_some() {
        apply_targeted_marker(annotations, marker);
        return;
    }
    let value = non_empty(&marker.value);
    match marker.key.as_str() {
        "description" => set_once(&mut annotations.description, value),
        "author" => set_once(&mut annotations.author, value),
        "version" => set_once(&mut annotations.version, value),
        _ => {}
    }
}

fn apply_targeted_marker(annotations: &mut Annotations, marker: &Marker) {
    let Some(target) = &marker.target else {
        return;
    };
    let entry = annotations.inputs.entry(target.clone()).or_default();
    match marker.key.as_str() {
        "input" | "description" => set_once(&mut entry.description, non_empty(&marker.value)),
        "required" => {
            if entry.required.is_none() {
                entry.required = Some(parse_flag(&marker.value).unwrap_or(true));
            }
        }
        _ => {}
    }
}

fn apply_input_marker(entry: &mut InputAnnotation, marker: &Marker) {
    match marker.key.as_str() {
        "description" | "input" => set_once(&mut entry.description, non_empty(&marker.value)),
        "required" => {
            if entry.required.is_none() {
                entry.required = Some(parse_flag(&marker.value).unwrap_or(true));
            }
        }
        _ => {}
    }
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "" => None,
        "true" | "yes" | "y" => Some(true),
        "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
