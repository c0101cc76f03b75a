//! Markup value types.
//!
//! The streamed buffer is parsed into plain, immutable nodes so classification
//! and storage never depend on a rendering platform.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node of parsed streamed markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkupNode {
    /// An element-like span (`<tag attr="...">children</tag>`)
    Element(Element),
    /// A run of plain text between elements
    Text { text: String },
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Lowercased tag name
    pub tag: String,
    /// Attribute values with entities decoded
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text { text: text.into() }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(el) => Some(el),
            MarkupNode::Text { .. } => None,
        }
    }

    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text { text } => out.push_str(text),
            MarkupNode::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Depth-first search over this node and its descendants.
    pub fn find_element<F>(&self, pred: &F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool,
    {
        let el = self.as_element()?;
        if pred(el) {
            return Some(el);
        }
        el.children.iter().find_map(|child| child.find_element(pred))
    }

    /// All elements (this node included) in document order.
    pub fn elements(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_elements(&mut out);
        out
    }

    fn collect_elements<'a>(&'a self, out: &mut Vec<&'a Element>) {
        if let MarkupNode::Element(el) = self {
            out.push(el);
            for child in &el.children {
                child.collect_elements(out);
            }
        }
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Builder-style child setter.
    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute value, if present and non-empty.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// First non-empty value among the given attribute names.
    pub fn first_attr(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.attr(name))
    }

    /// Whether the `class` attribute contains the given token.
    pub fn has_class(&self, class: &str) -> bool {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    /// Whether this element is identified by the marker name (tag or class).
    pub fn matches_marker(&self, marker: &str) -> bool {
        self.tag == marker || self.has_class(marker)
    }

    /// Heading level for `h1`..`h6`.
    pub fn heading_level(&self) -> Option<u8> {
        let rest = self.tag.strip_prefix('h')?;
        match rest.parse::<u8>() {
            Ok(level @ 1..=6) => Some(level),
            _ => None,
        }
    }
}

impl From<Element> for MarkupNode {
    fn from(el: Element) -> Self {
        MarkupNode::Element(el)
    }
}

/// One semantic unit of newly observed output: a top-level node of the
/// cleaned buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Position among the fragments of the buffer it was parsed from
    pub index: usize,
    /// Parsed node
    pub node: MarkupNode,
    /// Source text the node was parsed from
    pub raw: String,
}

impl Fragment {
    pub fn new(index: usize, node: MarkupNode, raw: impl Into<String>) -> Self {
        Self {
            index,
            node,
            raw: raw.into(),
        }
    }

    pub fn text_content(&self) -> String {
        self.node.text_content()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.node, MarkupNode::Text { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_card() -> MarkupNode {
        Element::new("div")
            .with_attr("class", "wrapper")
            .with_child(
                Element::new("tool-card")
                    .with_attr("data-tool-name", "create_file")
                    .with_child(MarkupNode::text("writing"))
                    .into(),
            )
            .with_child(MarkupNode::text(" done"))
            .into()
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        assert_eq!(tool_card().text_content(), "writing done");
    }

    #[test]
    fn test_find_element_searches_descendants() {
        let node = tool_card();
        let found = node.find_element(&|el: &Element| el.matches_marker("tool-card"));
        assert_eq!(found.map(|el| el.tag.as_str()), Some("tool-card"));
        assert!(node.find_element(&|el: &Element| el.tag == "span").is_none());
    }

    #[test]
    fn test_has_class_tokens() {
        let el = Element::new("div").with_attr("class", "card tool-card  active");
        assert!(el.has_class("tool-card"));
        assert!(el.matches_marker("tool-card"));
        assert!(!el.has_class("tool"));
    }

    #[test]
    fn test_attr_ignores_blank_values() {
        let el = Element::new("x").with_attr("data-path", "  ").with_attr("path", "a.rs");
        assert_eq!(el.attr("data-path"), None);
        assert_eq!(el.first_attr(&["data-path", "path"]), Some("a.rs"));
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(Element::new("H2").heading_level(), Some(2));
        assert_eq!(Element::new("h7").heading_level(), None);
        assert_eq!(Element::new("hr").heading_level(), None);
    }

    #[test]
    fn test_elements_in_document_order() {
        let node = tool_card();
        let tags: Vec<&str> = node.elements().iter().map(|el| el.tag.as_str()).collect();
        assert_eq!(tags, vec!["div", "tool-card"]);
    }
}
