//! Error types for Taskfeed.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum TaskfeedError {
    #[error("Session closed: {0} is completed and accepts no further updates")]
    SessionClosed(Uuid),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
