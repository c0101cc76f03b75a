//! Tolerant splitting of streamed markup into top-level fragments.
//!
//! The buffer is a partially written, loosely formed HTML-like document. The
//! splitter never fails: unclosed elements are closed at the end of input,
//! stray closing tags are ignored, and a tag opener still being streamed at
//! the very end is held back until it completes.

use crate::config::{MarkerEffect, MarkupConfig};
use std::collections::BTreeMap;
use taskfeed_types::{Element, Fragment, MarkupNode};

/// Elements that never take children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

/// Top-level elements that carry layout only and never become fragments.
const LAYOUT_ONLY: &[&str] = &["br", "hr", "wbr"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text {
        start: usize,
        end: usize,
    },
    Open {
        name: String,
        attributes: BTreeMap<String, String>,
        self_closing: bool,
        start: usize,
        end: usize,
    },
    Close {
        name: String,
        end: usize,
    },
    /// Comments, doctypes and processing instructions
    Ignored,
}

enum TagScan {
    Token(Token, usize),
    /// The tag runs past the end of the input
    Incomplete,
    NotATag,
}

/// Tokenize the input. Returns the tokens and the byte offset where complete
/// input ends (the start of a trailing incomplete tag, or the input length).
fn tokenize(input: &str) -> (Vec<Token>, usize) {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start: Option<usize> = None;

    while pos < bytes.len() {
        if bytes[pos] == b'<' {
            match scan_tag(input, pos) {
                TagScan::Token(token, next) => {
                    if let Some(start) = text_start.take() {
                        tokens.push(Token::Text { start, end: pos });
                    }
                    tokens.push(token);
                    pos = next;
                    continue;
                }
                TagScan::Incomplete => {
                    if let Some(start) = text_start.take() {
                        tokens.push(Token::Text { start, end: pos });
                    }
                    return (tokens, pos);
                }
                TagScan::NotATag => {}
            }
        }
        if text_start.is_none() {
            text_start = Some(pos);
        }
        pos += 1;
    }

    if let Some(start) = text_start {
        tokens.push(Token::Text {
            start,
            end: bytes.len(),
        });
    }
    (tokens, bytes.len())
}

/// Scan a tag starting at the `<` at `start`.
///
/// As in HTML, an unescaped `<` followed by a letter is markup even inside a
/// narrative text run: `x<y holds` opens a `y` tag that completes only at the
/// next `>`, and anything before that `>` is read as its attributes.
fn scan_tag(input: &str, start: usize) -> TagScan {
    let bytes = input.as_bytes();
    let rest = &input[start..];

    if rest.starts_with("<!--") {
        return match rest[4..].find("-->") {
            Some(i) => TagScan::Token(Token::Ignored, start + 4 + i + 3),
            None => TagScan::Incomplete,
        };
    }

    let Some(&next) = bytes.get(start + 1) else {
        return TagScan::Incomplete;
    };

    match next {
        b'!' | b'?' => match rest.find('>') {
            Some(i) => TagScan::Token(Token::Ignored, start + i + 1),
            None => TagScan::Incomplete,
        },
        b'/' => match bytes.get(start + 2) {
            None => TagScan::Incomplete,
            Some(b) if b.is_ascii_alphabetic() => match rest.find('>') {
                Some(i) => {
                    let end = start + i + 1;
                    let name = read_name(input, start + 2).to_ascii_lowercase();
                    TagScan::Token(Token::Close { name, end }, end)
                }
                None => TagScan::Incomplete,
            },
            Some(_) => TagScan::NotATag,
        },
        b if b.is_ascii_alphabetic() => scan_open_tag(input, start),
        _ => TagScan::NotATag,
    }
}

fn read_name(input: &str, from: usize) -> &str {
    let len = input[from..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
        .count();
    &input[from..from + len]
}

fn scan_open_tag(input: &str, start: usize) -> TagScan {
    let bytes = input.as_bytes();
    let name = read_name(input, start + 1).to_ascii_lowercase();
    let mut pos = start + 1 + name.len();
    let mut attributes = BTreeMap::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let Some(&b) = bytes.get(pos) else {
            return TagScan::Incomplete;
        };
        match b {
            b'>' => {
                let end = pos + 1;
                return TagScan::Token(
                    Token::Open {
                        name,
                        attributes,
                        self_closing: false,
                        start,
                        end,
                    },
                    end,
                );
            }
            b'/' => match bytes.get(pos + 1) {
                Some(b'>') => {
                    let end = pos + 2;
                    return TagScan::Token(
                        Token::Open {
                            name,
                            attributes,
                            self_closing: true,
                            start,
                            end,
                        },
                        end,
                    );
                }
                Some(_) => {
                    pos += 1;
                    continue;
                }
                None => return TagScan::Incomplete,
            },
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
            && !bytes[pos].is_ascii_whitespace()
        {
            pos += 1;
        }
        let attr_name = input[name_start..pos].to_ascii_lowercase();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let value = match bytes.get(pos) {
                None => return TagScan::Incomplete,
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = pos + 1;
                    match input[value_start..].find(quote as char) {
                        Some(i) => {
                            pos = value_start + i + 1;
                            &input[value_start..value_start + i]
                        }
                        None => return TagScan::Incomplete,
                    }
                }
                Some(_) => {
                    let value_start = pos;
                    while pos < bytes.len()
                        && bytes[pos] != b'>'
                        && !bytes[pos].is_ascii_whitespace()
                    {
                        pos += 1;
                    }
                    &input[value_start..pos]
                }
            };
            if !attr_name.is_empty() {
                attributes
                    .entry(attr_name)
                    .or_insert_with(|| decode_entities(value));
            }
        } else if !attr_name.is_empty() {
            attributes.entry(attr_name).or_insert_with(String::new);
        }
    }
}

/// Decode the handful of entities model output actually uses.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

struct OpenElement {
    element: Element,
    start: usize,
}

struct TopLevel {
    node: MarkupNode,
    start: usize,
    end: usize,
}

fn attach(
    stack: &mut [OpenElement],
    top: &mut Vec<TopLevel>,
    node: MarkupNode,
    start: usize,
    end: usize,
) {
    match stack.last_mut() {
        Some(parent) => parent.element.children.push(node),
        None => top.push(TopLevel { node, start, end }),
    }
}

fn close_innermost(stack: &mut Vec<OpenElement>, top: &mut Vec<TopLevel>, end: usize) {
    if let Some(open) = stack.pop() {
        attach(stack, top, open.element.into(), open.start, end);
    }
}

fn parse_top_level(input: &str) -> Vec<TopLevel> {
    let (tokens, complete_len) = tokenize(input);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut top = Vec::new();

    for token in tokens {
        match token {
            Token::Text { start, end } => {
                let node = MarkupNode::text(decode_entities(&input[start..end]));
                attach(&mut stack, &mut top, node, start, end);
            }
            Token::Open {
                name,
                attributes,
                self_closing,
                start,
                end,
            } => {
                let is_void = self_closing || VOID_ELEMENTS.contains(&name.as_str());
                let element = Element {
                    tag: name,
                    attributes,
                    children: Vec::new(),
                };
                if is_void {
                    attach(&mut stack, &mut top, element.into(), start, end);
                } else {
                    stack.push(OpenElement { element, start });
                }
            }
            Token::Close { name, end } => {
                // Closing an outer element implicitly closes everything inside it
                if let Some(depth) = stack.iter().rposition(|open| open.element.tag == name) {
                    while stack.len() > depth {
                        close_innermost(&mut stack, &mut top, end);
                    }
                }
            }
            Token::Ignored => {}
        }
    }

    while !stack.is_empty() {
        close_innermost(&mut stack, &mut top, complete_len);
    }
    top
}

/// Number of non-whitespace characters.
pub(crate) fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Split a cleaned buffer into its ordered top-level fragments.
///
/// Text runs with fewer than `min_text_chars` meaningful characters are
/// discarded and do not take an index.
pub fn split_fragments(cleaned: &str, min_text_chars: usize) -> Vec<Fragment> {
    parse_top_level(cleaned)
        .into_iter()
        .filter(|item| match &item.node {
            MarkupNode::Text { text } => meaningful_chars(text) >= min_text_chars.max(1),
            MarkupNode::Element(el) => !LAYOUT_ONLY.contains(&el.tag.as_str()),
        })
        .enumerate()
        .map(|(index, item)| Fragment::new(index, item.node, &cleaned[item.start..item.end]))
        .collect()
}

fn is_marker(name: &str, attributes: &BTreeMap<String, String>, markers: &[&str]) -> bool {
    if markers.contains(&name) {
        return true;
    }
    attributes
        .get("class")
        .map(|class| class.split_whitespace().any(|token| markers.contains(&token)))
        .unwrap_or(false)
}

/// Remove every element matching a `strip` marker. An echo block that is
/// still open at the end of the buffer swallows the rest of it, and a tag
/// opener still being streamed is cut off.
fn strip_elements(buffer: &str, markers: &[&str]) -> String {
    let (tokens, complete_len) = tokenize(buffer);
    let mut out = String::with_capacity(buffer.len());
    let mut copied_to = 0;
    let mut stripping: Option<String> = None;
    let mut depth = 0usize;

    for token in &tokens {
        match token {
            Token::Open {
                name,
                attributes,
                self_closing,
                start,
                end,
            } => match &stripping {
                None if is_marker(name, attributes, markers) => {
                    out.push_str(&buffer[copied_to..*start]);
                    copied_to = *end;
                    if !*self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                        stripping = Some(name.clone());
                        depth = 1;
                    }
                }
                Some(tag) if tag == name && !*self_closing => depth += 1,
                _ => {}
            },
            Token::Close { name, end } => {
                if stripping.as_deref() == Some(name.as_str()) {
                    depth -= 1;
                    if depth == 0 {
                        stripping = None;
                        copied_to = *end;
                    }
                }
            }
            Token::Text { .. } | Token::Ignored => {}
        }
    }

    if stripping.is_none() && copied_to < complete_len {
        out.push_str(&buffer[copied_to..complete_len]);
    }
    out
}

/// Byte length of the longest trailing suffix of `text` that is a proper
/// prefix of one of `phrases`.
fn partial_phrase_len(text: &str, phrases: &[String]) -> usize {
    phrases
        .iter()
        .flat_map(|phrase| {
            phrase
                .char_indices()
                .skip(1)
                .map(move |(end, _)| &phrase[..end])
        })
        .filter(|prefix| text.ends_with(prefix))
        .map(str::len)
        .max()
        .unwrap_or(0)
}

/// Remove known noise: `strip` marker elements and boilerplate phrases.
///
/// The result only ever grows while the buffer grows. Anything that may still
/// turn into noise is held back: an incomplete trailing tag opener, and a
/// trailing partial boilerplate phrase (`Copy co`).
pub fn strip_noise(buffer: &str, config: &MarkupConfig) -> String {
    let strip_markers = config.markers_with(MarkerEffect::Strip);
    let mut cleaned = strip_elements(buffer, &strip_markers);
    for phrase in &config.noise_phrases {
        if !phrase.is_empty() && cleaned.contains(phrase.as_str()) {
            cleaned = cleaned.replace(phrase.as_str(), "");
        }
    }
    let held = partial_phrase_len(&cleaned, &config.noise_phrases);
    cleaned.truncate(cleaned.len() - held);
    cleaned
}
