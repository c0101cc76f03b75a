//! Streaming progress log core for Taskfeed.
//!
//! Turns successive snapshots of a model's streamed markup into an ordered,
//! append-only log of tool, phase and text steps.

mod classifier;
mod config;
mod diff;
mod error;
mod file_tracker;
mod markup;
mod session;
mod step_log;

pub use classifier::{Classification, ContentClassifier};
pub use config::{DiffConfig, FileTrackerConfig, MarkerEffect, MarkupConfig, SessionConfig};
pub use diff::{IncrementSource, Observation, PendingRestart, StreamDiffEngine};
pub use error::TaskfeedError;
pub use file_tracker::FileEditTracker;
pub use markup::{decode_entities, split_fragments, strip_noise};
pub use session::{SessionObserver, TaskSession};
pub use step_log::StepLog;

/// Result type for Taskfeed operations.
pub type Result<T> = std::result::Result<T, TaskfeedError>;
