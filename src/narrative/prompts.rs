//! Prompt construction.

use super::{Constraints, SectionKind};

/// System prompt shared by every provider.
pub const SYSTEM_PROMPT: &str = "You are a GitHub Actions documentation assistant. Your task is to provide clear, concise, and helpful information about GitHub Actions workflows.";

/// Workflow text beyond this many characters is cut from the prompt.
const MAX_SOURCE_CHARS: usize = 12_000;

/// Build the user prompt for one narrative section.
pub fn build_prompt(kind: SectionKind, workflow_raw: &str, constraints: &Constraints) -> String {
    let instructions = match kind {
        SectionKind::UsageInformation => {
            "Explain how to use the GitHub Actions workflow below. Cover when it runs, \
             which inputs, secrets and variables it expects, and give one or two short \
             practical examples of triggering or calling it."
        }
        SectionKind::SuggestedImprovements => {
            "Review the GitHub Actions workflow below and suggest 3-5 specific, actionable \
             improvements, such as adding timeouts, tightening permissions, caching \
             dependencies, pinning action versions or adding status checks before deployment."
        }
    };

    let source = truncate_chars(workflow_raw, MAX_SOURCE_CHARS);

    format!(
        "{}\n\nKeep the answer under {} words. Use plain Markdown paragraphs or lists, \
         without headings.\n\nWorkflow:\n```yaml\n{}\n```",
        instructions,
        constraints.max_words,
        source.trim_end()
    )
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_per_section() {
        let constraints = Constraints::default();
        let usage = build_prompt(SectionKind::UsageInformation, "on: push\n", &constraints);
        let improve = build_prompt(SectionKind::SuggestedImprovements, "on: push\n", &constraints);

        assert!(usage.starts_with("Explain how to use"));
        assert!(improve.contains("actionable"));
        assert!(usage.contains("under 300 words"));
        assert!(usage.ends_with("```yaml\non: push\n```"));
    }

    #[test]
    fn test_long_source_is_truncated() {
        let raw = "x".repeat(MAX_SOURCE_CHARS + 50);
        let prompt = build_prompt(
            SectionKind::UsageInformation,
            &raw,
            &Constraints::default(),
        );
        assert!(prompt.len() < raw.len() + 400);
        assert!(!prompt.contains(&"x".repeat(MAX_SOURCE_CHARS + 1)));
    }
}
