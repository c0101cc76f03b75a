//! Fragment classification into tool, phase and text steps.

use crate::config::{MarkerEffect, MarkupConfig};
use crate::markup::meaningful_chars;
use once_cell::sync::Lazy;
use regex::Regex;
use taskfeed_types::{Element, Fragment, MarkupNode, StepKind};
use tracing::trace;

/// Attributes carrying a tool card's tool name, in priority order.
pub(crate) const TOOL_NAME_ATTRS: &[&str] = &["data-tool-name", "data-tool", "name"];

/// Attributes carrying a file path, in priority order.
pub(crate) const PATH_ATTRS: &[&str] = &["data-path", "data-file", "path"];

/// Attributes a tool title's context may come from, in priority order.
const CONTEXT_ATTRS: &[&str] = &["data-path", "data-file", "path", "data-command", "command"];

/// Title used when a text fragment has nothing readable.
const THINKING_TITLE: &str = "Thinking...";

/// Maximum length of a text step title.
const TEXT_TITLE_MAX: usize = 50;

/// Maximum length of a tool title's context suffix.
const TOOL_CONTEXT_MAX: usize = 20;

/// One to six leading `#` followed by anything but another `#`.
static MARKDOWN_HEADING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(?:[^#]|$)").expect("Invalid heading regex"));

static SENTENCE_BREAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?\n]").expect("Invalid sentence regex"));

/// Result of classifying one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: StepKind,
    pub title: String,
    /// Tool name for tool fragments
    pub tool_name: Option<String>,
}

/// Assigns a kind and a title to fragments. Pure: the same fragment always
/// classifies the same way.
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    tool_markers: Vec<String>,
    phase_markers: Vec<String>,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new(&MarkupConfig::default())
    }
}

impl ContentClassifier {
    pub fn new(config: &MarkupConfig) -> Self {
        let owned = |effect: MarkerEffect| -> Vec<String> {
            config
                .markers_with(effect)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            tool_markers: owned(MarkerEffect::Tool),
            phase_markers: owned(MarkerEffect::Phase),
        }
    }

    pub fn classify(&self, fragment: &Fragment) -> Classification {
        let classification = self
            .classify_tool(&fragment.node)
            .or_else(|| self.classify_phase(&fragment.node))
            .unwrap_or_else(|| Classification {
                kind: StepKind::Text,
                title: text_title(&fragment.text_content()),
                tool_name: None,
            });
        trace!(
            target: "taskfeed::classify",
            "Fragment {} classified as {}: {}",
            fragment.index,
            classification.kind,
            classification.title
        );
        classification
    }

    fn matching_marker<'a>(&'a self, el: &Element, markers: &'a [String]) -> Option<&'a str> {
        markers
            .iter()
            .find(|marker| el.matches_marker(marker))
            .map(String::as_str)
    }

    fn classify_tool(&self, node: &MarkupNode) -> Option<Classification> {
        let card = node.find_element(&|el: &Element| {
            self.matching_marker(el, &self.tool_markers).is_some()
        })?;
        let marker = self.matching_marker(card, &self.tool_markers)?;

        let tool_name = card
            .first_attr(TOOL_NAME_ATTRS)
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| marker.to_string());

        let title = match card.first_attr(CONTEXT_ATTRS).and_then(tool_context) {
            Some(context) => format!("Running: {} ({})", tool_name, context),
            None => format!("Running: {}", tool_name),
        };

        Some(Classification {
            kind: StepKind::Tool,
            title,
            tool_name: Some(tool_name),
        })
    }

    fn classify_phase(&self, node: &MarkupNode) -> Option<Classification> {
        let title = match node {
            MarkupNode::Element(el)
                if el.heading_level().is_some()
                    || self.matching_marker(el, &self.phase_markers).is_some() =>
            {
                heading_title(&node.text_content())
            }
            MarkupNode::Text { text } if MARKDOWN_HEADING_REGEX.is_match(text.trim_start()) => {
                heading_title(text)
            }
            _ => return None,
        };

        if title.is_empty() {
            return None;
        }
        Some(Classification {
            kind: StepKind::Phase,
            title,
            tool_name: None,
        })
    }
}

/// First line of a heading with leading `#` and whitespace removed.
fn heading_title(text: &str) -> String {
    text.trim_start()
        .lines()
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| c == '#' || c.is_whitespace())
        .trim_end()
        .to_string()
}

/// Short context for a tool title: the first two whitespace-separated tokens.
fn tool_context(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let tokens: Vec<&str> = decoded.split_whitespace().take(2).collect();
    if tokens.is_empty() {
        return None;
    }
    Some(truncate_str(&tokens.join(" "), TOOL_CONTEXT_MAX))
}

/// First sentence of narrative text, or the thinking placeholder.
fn text_title(text: &str) -> String {
    if meaningful_chars(text) == 0 {
        return THINKING_TITLE.to_string();
    }
    SENTENCE_BREAK_REGEX
        .split(text)
        .map(str::trim)
        .find(|sentence| !sentence.is_empty())
        .map(|sentence| {
            let collapsed = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
            truncate_str(&collapsed, TEXT_TITLE_MAX)
        })
        .unwrap_or_else(|| THINKING_TITLE.to_string())
}

/// Truncate a string to a maximum number of characters with ellipsis.
pub(crate) fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::split_fragments;

    fn classify(input: &str) -> Classification {
        let fragments = split_fragments(input, 3);
        assert_eq!(fragments.len(), 1, "expected one fragment in {:?}", input);
        ContentClassifier::default().classify(&fragments[0])
    }

    #[test]
    fn test_tool_card_with_path() {
        let c = classify(r#"<tool-card data-tool-name="create_file" data-path="src/x.ts">...</tool-card>"#);
        assert_eq!(c.kind, StepKind::Tool);
        assert_eq!(c.title, "Running: create_file (src/x.ts)");
        assert_eq!(c.tool_name.as_deref(), Some("create_file"));
    }

    #[test]
    fn test_tool_card_by_class_and_nested() {
        let c = classify(
            r#"<div class="step"><div class="file-edit-card" data-tool="update_file" data-path="lib/a.rs"></div></div>"#,
        );
        assert_eq!(c.kind, StepKind::Tool);
        assert_eq!(c.title, "Running: update_file (lib/a.rs)");
    }

    #[test]
    fn test_tool_without_name_or_context() {
        let c = classify("<tool-card>working</tool-card>");
        assert_eq!(c.kind, StepKind::Tool);
        assert_eq!(c.title, "Running: tool-card");
    }

    #[test]
    fn test_tool_context_two_tokens_truncated() {
        let c = classify(r#"<tool-card data-tool-name="run_command" data-command="cargo test --workspace --all"></tool-card>"#);
        assert_eq!(c.title, "Running: run_command (cargo test)");

        let c = classify(r#"<tool-card data-tool-name="read_file" data-path="crates/very-long-directory/file.rs"></tool-card>"#);
        assert_eq!(c.title, "Running: read_file (crates/very-long-...)");
    }

    #[test]
    fn test_tool_context_percent_decoded() {
        let c = classify(r#"<tool-card data-tool-name="create_file" data-path="src%2Fa.ts"></tool-card>"#);
        assert_eq!(c.title, "Running: create_file (src/a.ts)");
    }

    #[test]
    fn test_markdown_heading_text() {
        let c = classify("# Plan\n");
        assert_eq!(c.kind, StepKind::Phase);
        assert_eq!(c.title, "Plan");

        let c = classify("### Step two: wire it up\nthen more text");
        assert_eq!(c.kind, StepKind::Phase);
        assert_eq!(c.title, "Step two: wire it up");
    }

    #[test]
    fn test_too_many_hashes_is_text() {
        let c = classify("####### not a heading");
        assert_eq!(c.kind, StepKind::Text);
    }

    #[test]
    fn test_heading_elements() {
        let c = classify("<h2>Implementation</h2>");
        assert_eq!(c.kind, StepKind::Phase);
        assert_eq!(c.title, "Implementation");

        let c = classify("<h1></h1>");
        assert_eq!(c.kind, StepKind::Text);
        assert_eq!(c.title, "Thinking...");
    }

    #[test]
    fn test_phase_marker() {
        let mut config = MarkupConfig::default();
        config
            .markers
            .insert("phase-header".to_string(), MarkerEffect::Phase);
        let classifier = ContentClassifier::new(&config);
        let fragments = split_fragments(r#"<div class="phase-header">Testing</div>"#, 3);
        let c = classifier.classify(&fragments[0]);
        assert_eq!(c.kind, StepKind::Phase);
        assert_eq!(c.title, "Testing");
    }

    #[test]
    fn test_text_first_sentence() {
        let c = classify("I will read the file first. Then edit it.");
        assert_eq!(c.kind, StepKind::Text);
        assert_eq!(c.title, "I will read the file first");

        let c = classify("Done!\nAll good");
        assert_eq!(c.title, "Done");
    }

    #[test]
    fn test_text_title_truncated() {
        let long = "word ".repeat(30);
        let c = classify(&long);
        assert_eq!(c.title.chars().count(), 50);
        assert!(c.title.ends_with("..."));
    }

    #[test]
    fn test_text_without_readable_content() {
        let c = classify("<div><img src=\"spinner.gif\"></div>");
        assert_eq!(c.kind, StepKind::Text);
        assert_eq!(c.title, "Thinking...");

        let c = classify("...");
        assert_eq!(c.title, "Thinking...");
    }

    #[test]
    fn test_malformed_markup_degrades_to_text() {
        let c = classify("<div <<broken>> text here");
        assert_eq!(c.kind, StepKind::Text);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let fragments = split_fragments(
            r#"<tool-card data-tool-name="modify_file" data-path="a.ts">x</tool-card>"#,
            3,
        );
        let classifier = ContentClassifier::default();
        assert_eq!(classifier.classify(&fragments[0]), classifier.classify(&fragments[0]));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 20), "short");
        assert_eq!(truncate_str("abcdefghij", 5), "ab...");
        assert_eq!(truncate_str("ééééééé", 6), "ééé...");
    }
}
