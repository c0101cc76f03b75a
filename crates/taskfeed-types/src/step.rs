//! Step log types.
//!
//! A step is one classified, append-only record of the progress log. Dividers
//! mark a confirmed stream restart and carry no sequence number.

use crate::Fragment;
use serde::{Deserialize, Serialize};

/// Label inserted into the log when a stream restart is confirmed.
pub const STREAM_RESTARTED_LABEL: &str = "Stream Restarted";

/// Classification of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Agent tool invocation
    Tool,
    /// Phase or section header
    Phase,
    /// Narrative text
    Text,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Tool => "tool",
            StepKind::Phase => "phase",
            StepKind::Text => "text",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted, ordered record in the step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique step identifier
    pub id: String,
    pub kind: StepKind,
    /// Human-readable title
    pub title: String,
    /// Tool name for tool steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Fragments this step was derived from
    pub content: Vec<Fragment>,
    /// Whether the step body is collapsed in the presentation layer
    #[serde(default)]
    pub collapsed: bool,
    /// Strictly increasing, gapless position (starting at 1)
    pub sequence: u64,
}

impl Step {
    pub fn view(&self) -> StepView {
        StepView {
            id: self.id.clone(),
            sequence: self.sequence,
            kind: self.kind,
            title: self.title.clone(),
            collapsed: self.collapsed,
        }
    }
}

/// A non-interactive separator in the step order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divider {
    pub label: String,
    /// Number of steps that preceded this divider
    pub after_sequence: u64,
}

/// One entry of the ordered log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    Step(Step),
    Divider(Divider),
}

impl LogEntry {
    pub fn as_step(&self) -> Option<&Step> {
        match self {
            LogEntry::Step(step) => Some(step),
            LogEntry::Divider(_) => None,
        }
    }

    pub fn is_divider(&self) -> bool {
        matches!(self, LogEntry::Divider(_))
    }

    pub fn view(&self) -> EntryView {
        match self {
            LogEntry::Step(step) => EntryView::Step(step.view()),
            LogEntry::Divider(divider) => EntryView::Divider {
                label: divider.label.clone(),
            },
        }
    }
}

/// Read-only projection of a step for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub id: String,
    pub sequence: u64,
    pub kind: StepKind,
    pub title: String,
    pub collapsed: bool,
}

/// Read-only projection of a log entry for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryView {
    Step(StepView),
    Divider { label: String },
}
