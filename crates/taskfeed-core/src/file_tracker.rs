//! Tracking of files touched by file-mutating tool steps.

use crate::classifier::{PATH_ATTRS, TOOL_NAME_ATTRS};
use crate::config::FileTrackerConfig;
use std::collections::HashSet;
use taskfeed_types::{Step, StepKind};
use tracing::debug;

/// Deduplicated, insertion-ordered set of edited file paths.
///
/// Derived from step content and never authoritative. Entries are only
/// removed by `clear`, which a session calls on explicit reset.
#[derive(Debug)]
pub struct FileEditTracker {
    /// Lowercased action substrings
    actions: Vec<String>,
    paths: Vec<String>,
    seen: HashSet<String>,
}

impl FileEditTracker {
    pub fn new(config: &FileTrackerConfig) -> Self {
        Self {
            actions: config
                .actions
                .iter()
                .map(|action| action.to_lowercase())
                .filter(|action| !action.is_empty())
                .collect(),
            paths: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn is_file_action(&self, tool_name: &str) -> bool {
        let lower = tool_name.to_lowercase();
        self.actions.iter().any(|action| lower.contains(action.as_str()))
    }

    /// Record paths from a tool step's content. Returns the paths that were
    /// not tracked before.
    pub fn scan(&mut self, step: &Step) -> Vec<String> {
        if step.kind != StepKind::Tool {
            return Vec::new();
        }

        let mut added = Vec::new();
        for fragment in &step.content {
            for el in fragment.node.elements() {
                let tool_name = el
                    .first_attr(TOOL_NAME_ATTRS)
                    .or(step.tool_name.as_deref());
                let Some(tool_name) = tool_name else {
                    continue;
                };
                if !self.is_file_action(tool_name) {
                    continue;
                }
                if let Some(raw) = el.first_attr(PATH_ATTRS) {
                    if let Some(path) = self.insert(raw) {
                        added.push(path);
                    }
                }
            }
        }
        added
    }

    fn insert(&mut self, raw: &str) -> Option<String> {
        let path = decode_path(raw);
        if path.is_empty() || !self.seen.insert(path.clone()) {
            return None;
        }
        debug!(target: "taskfeed::files", "Tracking edited file: {}", path);
        self.paths.push(path.clone());
        Some(path)
    }

    /// Tracked paths in insertion order.
    pub fn list(&self) -> &[String] {
        &self.paths
    }

    pub fn count(&self) -> usize {
        self.paths.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.seen.contains(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.seen.clear();
    }
}

/// Percent-decode a path, keeping the raw value if it is not valid UTF-8
/// once decoded.
fn decode_path(raw: &str) -> String {
    urlencoding::decode(raw.trim())
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.trim().to_string())
}
