//! Task session lifecycle types.

use crate::{EntryView, StepView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a task session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    /// Terminal; no further stream updates are accepted
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Events emitted by a task session, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A step was appended to the log
    StepAdded { session_id: Uuid, step: StepView },
    /// A restart divider was appended to the log
    Divider { session_id: Uuid, label: String },
    /// The set of edited files grew; carries the full list
    FilesChanged {
        session_id: Uuid,
        paths: Vec<String>,
    },
    /// A step was collapsed or expanded
    StepToggled {
        session_id: Uuid,
        step_id: String,
        collapsed: bool,
    },
    /// The session reached its terminal state
    Completed { session_id: Uuid },
}

/// Read-only snapshot of a session for a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub entries: Vec<EntryView>,
    pub files: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Step views only, dividers skipped.
    pub fn steps(&self) -> Vec<&StepView> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                EntryView::Step(step) => Some(step),
                EntryView::Divider { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepKind;

    #[test]
    fn test_event_tagging() {
        let session_id = Uuid::new_v4();
        let event = SessionEvent::Completed { session_id };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");

        let event = SessionEvent::FilesChanged {
            session_id,
            paths: vec!["src/a.ts".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "files_changed");
        assert_eq!(json["paths"][0], "src/a.ts");
    }

    #[test]
    fn test_snapshot_steps_skip_dividers() {
        let snapshot = SessionSnapshot {
            session_id: Uuid::new_v4(),
            status: SessionStatus::Active,
            entries: vec![
                EntryView::Step(StepView {
                    id: "a".to_string(),
                    sequence: 1,
                    kind: StepKind::Text,
                    title: "Hello".to_string(),
                    collapsed: false,
                }),
                EntryView::Divider {
                    label: "Stream Restarted".to_string(),
                },
            ],
            files: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        };
        assert_eq!(snapshot.steps().len(), 1);
        assert_eq!(snapshot.status.to_string(), "active");
    }
}
