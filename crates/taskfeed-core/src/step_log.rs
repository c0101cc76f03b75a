//! Ordered, append-only storage of steps and restart dividers.

use crate::{Result, TaskfeedError};
use std::collections::HashMap;
use taskfeed_types::{Divider, EntryView, Fragment, LogEntry, Step, StepKind};
use tracing::debug;
use uuid::Uuid;

/// Append-only step log with per-step collapse state.
///
/// Steps are never removed or rewritten once appended; only their
/// `collapsed` flag changes. Sequence numbers start at 1 and have no gaps.
/// Dividers take no sequence number.
#[derive(Debug, Default)]
pub struct StepLog {
    entries: Vec<LogEntry>,
    /// Step id -> position in `entries`
    index: HashMap<String, usize>,
    last_sequence: u64,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step and return its id.
    pub fn append(&mut self, kind: StepKind, content: Vec<Fragment>, title: String) -> String {
        self.push_step(kind, content, title, None)
    }

    /// Append a tool step that records the tool name.
    pub fn append_tool(&mut self, content: Vec<Fragment>, title: String, tool_name: String) -> String {
        self.push_step(StepKind::Tool, content, title, Some(tool_name))
    }

    fn push_step(
        &mut self,
        kind: StepKind,
        content: Vec<Fragment>,
        title: String,
        tool_name: Option<String>,
    ) -> String {
        self.last_sequence += 1;
        let id = format!("step-{}", Uuid::new_v4());
        debug!(
            target: "taskfeed::steps",
            "Appending step #{} ({}): {}",
            self.last_sequence,
            kind,
            title
        );
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(LogEntry::Step(Step {
            id: id.clone(),
            kind,
            title,
            tool_name,
            content,
            collapsed: false,
            sequence: self.last_sequence,
        }));
        id
    }

    /// Append a divider at the current end of the log.
    pub fn add_divider(&mut self, label: &str) {
        debug!(target: "taskfeed::steps", "Appending divider: {}", label);
        self.entries.push(LogEntry::Divider(Divider {
            label: label.to_string(),
            after_sequence: self.last_sequence,
        }));
    }

    fn step_mut(&mut self, id: &str) -> Result<&mut Step> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| TaskfeedError::StepNotFound(id.to_string()))?;
        match self.entries.get_mut(position) {
            Some(LogEntry::Step(step)) => Ok(step),
            _ => Err(TaskfeedError::StepNotFound(id.to_string())),
        }
    }

    /// Set a step's collapsed flag. Returns the step after the change.
    pub fn set_collapsed(&mut self, id: &str, collapsed: bool) -> Result<&Step> {
        let step = self.step_mut(id)?;
        step.collapsed = collapsed;
        Ok(step)
    }

    /// Collapse a step. Idempotent.
    pub fn collapse(&mut self, id: &str) -> Result<&Step> {
        self.set_collapsed(id, true)
    }

    /// Expand a step. Idempotent.
    pub fn expand(&mut self, id: &str) -> Result<&Step> {
        self.set_collapsed(id, false)
    }

    /// Flip a step's collapsed flag.
    pub fn toggle(&mut self, id: &str) -> Result<&Step> {
        let step = self.step_mut(id)?;
        step.collapsed = !step.collapsed;
        Ok(step)
    }

    /// Collapse every step; returns the ids whose state changed.
    pub fn collapse_all(&mut self) -> Vec<String> {
        self.set_all(true)
    }

    /// Expand every step; returns the ids whose state changed.
    pub fn expand_all(&mut self) -> Vec<String> {
        self.set_all(false)
    }

    fn set_all(&mut self, collapsed: bool) -> Vec<String> {
        self.entries
            .iter_mut()
            .filter_map(|entry| match entry {
                LogEntry::Step(step) if step.collapsed != collapsed => {
                    step.collapsed = collapsed;
                    Some(step.id.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Drop everything and restart numbering.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.last_sequence = 0;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.entries.iter().filter_map(LogEntry::as_step)
    }

    pub fn get(&self, id: &str) -> Option<&Step> {
        self.index
            .get(id)
            .and_then(|position| self.entries.get(*position))
            .and_then(LogEntry::as_step)
    }

    /// Step with the given sequence number.
    pub fn by_sequence(&self, sequence: u64) -> Option<&Step> {
        self.steps().find(|step| step.sequence == sequence)
    }

    /// Number of steps (dividers excluded).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn divider_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_divider()).count()
    }

    pub fn views(&self) -> Vec<EntryView> {
        self.entries.iter().map(LogEntry::view).collect()
    }
}
