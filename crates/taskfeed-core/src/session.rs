//! Task session orchestration.
//!
//! A `TaskSession` owns everything for one user request:
//! - An increment source turning buffer snapshots into new fragments
//! - The classifier assigning kinds and titles
//! - The step log and the file edit tracker
//!
//! It is the only entry point for stream updates. Calls are expected to arrive
//! serially from one owner; nothing here blocks or spawns.

use crate::classifier::ContentClassifier;
use crate::config::SessionConfig;
use crate::diff::{IncrementSource, Observation, StreamDiffEngine};
use crate::file_tracker::FileEditTracker;
use crate::step_log::StepLog;
use crate::{Result, TaskfeedError};
use chrono::{DateTime, Utc};
use taskfeed_types::{
    Fragment, SessionEvent, SessionSnapshot, SessionStatus, Step, StepKind,
    STREAM_RESTARTED_LABEL,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Receives lifecycle callbacks synchronously, inside the call that caused
/// them. All methods default to no-ops.
pub trait SessionObserver {
    fn on_step_added(&mut self, _step: &Step) {}

    fn on_divider(&mut self, _label: &str) {}

    /// Called with the full tracked list whenever it grows.
    fn on_files_changed(&mut self, _paths: &[String]) {}

    fn on_step_toggled(&mut self, _step: &Step) {}

    fn on_completed(&mut self) {}
}

/// Progress log state for one user task.
///
/// `active -> completed` is the only transition. Updates after completion
/// fail with [`TaskfeedError::SessionClosed`] and change nothing.
pub struct TaskSession<D: IncrementSource = StreamDiffEngine> {
    id: Uuid,
    status: SessionStatus,
    source: D,
    classifier: ContentClassifier,
    steps: StepLog,
    files: FileEditTracker,
    observers: Vec<Box<dyn SessionObserver>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TaskSession {
    /// Create a session using the length-heuristic diff engine.
    pub fn new(config: &SessionConfig) -> Self {
        let source = StreamDiffEngine::new(config.diff.clone(), config.markup.clone());
        Self::with_source(source, config)
    }

    /// Diff engine state, for inspection.
    pub fn diff_engine(&self) -> &StreamDiffEngine {
        &self.source
    }
}

impl<D: IncrementSource> TaskSession<D> {
    /// Create a session on top of a custom increment source.
    pub fn with_source(source: D, config: &SessionConfig) -> Self {
        let id = Uuid::new_v4();
        info!(target: "taskfeed::session", "Starting task session {}", id);
        Self {
            id,
            status: SessionStatus::Active,
            source,
            classifier: ContentClassifier::new(&config.markup),
            steps: StepLog::new(),
            files: FileEditTracker::new(&config.files),
            observers: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn steps(&self) -> &StepLog {
        &self.steps
    }

    pub fn files(&self) -> &FileEditTracker {
        &self.files
    }

    /// Feed the latest full buffer.
    ///
    /// Returns the events produced, in order. A suppressed snapshot produces
    /// none.
    pub fn update(&mut self, buffer: &str) -> Result<Vec<SessionEvent>> {
        if self.is_completed() {
            debug!(target: "taskfeed::session", "Rejecting update for completed session {}", self.id);
            return Err(TaskfeedError::SessionClosed(self.id));
        }

        let mut events = Vec::new();
        match self.source.observe(buffer) {
            Observation::Suppressed => {
                debug!(target: "taskfeed::session", "Update suppressed pending restart confirmation");
            }
            Observation::RestartConfirmed { fragments } => {
                info!(
                    target: "taskfeed::session",
                    "Stream restarted in session {}, replaying {} fragments after {} steps",
                    self.id,
                    fragments.len(),
                    self.steps.len()
                );
                self.steps.add_divider(STREAM_RESTARTED_LABEL);
                for observer in &mut self.observers {
                    observer.on_divider(STREAM_RESTARTED_LABEL);
                }
                events.push(SessionEvent::Divider {
                    session_id: self.id,
                    label: STREAM_RESTARTED_LABEL.to_string(),
                });
                self.ingest(fragments, &mut events);
            }
            Observation::Increment { fragments } => {
                self.ingest(fragments, &mut events);
            }
        }
        Ok(events)
    }

    /// Classify, append and scan each fragment in order.
    fn ingest(&mut self, fragments: Vec<Fragment>, events: &mut Vec<SessionEvent>) {
        for fragment in fragments {
            let classification = self.classifier.classify(&fragment);
            let id = match classification.tool_name {
                Some(tool_name) if classification.kind == StepKind::Tool => {
                    self.steps
                        .append_tool(vec![fragment], classification.title, tool_name)
                }
                _ => self
                    .steps
                    .append(classification.kind, vec![fragment], classification.title),
            };

            let Some(step) = self.steps.get(&id) else {
                continue;
            };
            for observer in &mut self.observers {
                observer.on_step_added(step);
            }
            events.push(SessionEvent::StepAdded {
                session_id: self.id,
                step: step.view(),
            });

            let added = self.files.scan(step);
            if !added.is_empty() {
                let paths = self.files.list().to_vec();
                for observer in &mut self.observers {
                    observer.on_files_changed(&paths);
                }
                events.push(SessionEvent::FilesChanged {
                    session_id: self.id,
                    paths,
                });
            }
        }
    }

    /// Mark the session completed. Completing twice is a no-op.
    pub fn complete(&mut self) -> Vec<SessionEvent> {
        if self.is_completed() {
            return Vec::new();
        }
        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
        info!(
            target: "taskfeed::session",
            "Session {} completed with {} steps, {} files changed",
            self.id,
            self.steps.len(),
            self.files.count()
        );
        for observer in &mut self.observers {
            observer.on_completed();
        }
        vec![SessionEvent::Completed { session_id: self.id }]
    }

    /// Full teardown for a discarded task: clears the log, the tracked files
    /// and the diff state, and makes the session active again.
    pub fn reset(&mut self) {
        info!(target: "taskfeed::session", "Resetting session {}", self.id);
        self.steps.clear();
        self.files.clear();
        self.source.reset();
        self.status = SessionStatus::Active;
        self.started_at = Utc::now();
        self.completed_at = None;
    }

    fn toggled(&mut self, id: &str) -> Result<SessionEvent> {
        let step = self
            .steps
            .get(id)
            .ok_or_else(|| TaskfeedError::StepNotFound(id.to_string()))?;
        for observer in &mut self.observers {
            observer.on_step_toggled(step);
        }
        Ok(SessionEvent::StepToggled {
            session_id: self.id,
            step_id: step.id.clone(),
            collapsed: step.collapsed,
        })
    }

    /// Collapse a step. Allowed after completion: presentation state is not
    /// stream state.
    pub fn collapse(&mut self, id: &str) -> Result<SessionEvent> {
        self.steps.collapse(id)?;
        self.toggled(id)
    }

    pub fn expand(&mut self, id: &str) -> Result<SessionEvent> {
        self.steps.expand(id)?;
        self.toggled(id)
    }

    pub fn toggle(&mut self, id: &str) -> Result<SessionEvent> {
        self.steps.toggle(id)?;
        self.toggled(id)
    }

    /// Collapse every step; emits an event per step that changed.
    pub fn collapse_all(&mut self) -> Vec<SessionEvent> {
        let changed = self.steps.collapse_all();
        changed
            .iter()
            .filter_map(|id| self.toggled(id).ok())
            .collect()
    }

    pub fn expand_all(&mut self) -> Vec<SessionEvent> {
        let changed = self.steps.expand_all();
        changed
            .iter()
            .filter_map(|id| self.toggled(id).ok())
            .collect()
    }

    /// Read-only view for a presentation layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            status: self.status,
            entries: self.steps.views(),
            files: self.files.list().to_vec(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
