//! Replay of recorded buffer streams.
//!
//! A recording is JSON Lines. Each line is either a command object tagged by
//! `type`, or a bare JSON string, which is shorthand for an update with that
//! buffer:
//!
//! ```text
//! "# Plan\n"
//! {"type":"update","buffer":"# Plan\n<tool-card ...>"}
//! {"type":"collapse","sequence":1}
//! {"type":"complete"}
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use taskfeed_core::{IncrementSource, TaskSession, TaskfeedError};
use taskfeed_types::SessionEvent;
use tracing::{debug, info, warn};

/// One recorded operation on a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayCommand {
    Update { buffer: String },
    Complete,
    Reset,
    /// Steps are addressed by sequence number; ids are random per run
    Collapse { sequence: u64 },
    Expand { sequence: u64 },
    Toggle { sequence: u64 },
    CollapseAll,
    ExpandAll,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Buffer(String),
    Command(ReplayCommand),
}

impl ReplayCommand {
    /// Parse one recording line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> serde_json::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let command = match serde_json::from_str::<ReplayLine>(line)? {
            ReplayLine::Buffer(buffer) => ReplayCommand::Update { buffer },
            ReplayLine::Command(command) => command,
        };
        Ok(Some(command))
    }

    /// Apply the command to a session and return the events it produced.
    pub fn apply<D: IncrementSource>(
        self,
        session: &mut TaskSession<D>,
    ) -> taskfeed_core::Result<Vec<SessionEvent>> {
        match self {
            ReplayCommand::Update { buffer } => session.update(&buffer),
            ReplayCommand::Complete => Ok(session.complete()),
            ReplayCommand::Reset => {
                session.reset();
                Ok(Vec::new())
            }
            ReplayCommand::Collapse { sequence } => {
                let id = step_id(session, sequence)?;
                Ok(vec![session.collapse(&id)?])
            }
            ReplayCommand::Expand { sequence } => {
                let id = step_id(session, sequence)?;
                Ok(vec![session.expand(&id)?])
            }
            ReplayCommand::Toggle { sequence } => {
                let id = step_id(session, sequence)?;
                Ok(vec![session.toggle(&id)?])
            }
            ReplayCommand::CollapseAll => Ok(session.collapse_all()),
            ReplayCommand::ExpandAll => Ok(session.expand_all()),
        }
    }
}

fn step_id<D: IncrementSource>(
    session: &TaskSession<D>,
    sequence: u64,
) -> taskfeed_core::Result<String> {
    session
        .steps()
        .by_sequence(sequence)
        .map(|step| step.id.clone())
        .ok_or_else(|| TaskfeedError::StepNotFound(format!("#{}", sequence)))
}

/// Totals for one replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    /// Lines that did not parse
    pub skipped: usize,
    /// Commands the session refused
    pub rejected: usize,
}

/// Replay every line of `reader` into `session`, passing each event to
/// `on_event` as it is produced.
///
/// Bad lines and refused commands are logged and skipped; only read errors
/// abort the replay.
pub fn run<D, R, F>(session: &mut TaskSession<D>, reader: R, mut on_event: F) -> Result<ReplaySummary>
where
    D: IncrementSource,
    R: BufRead,
    F: FnMut(&SessionEvent),
{
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;

        let command = match ReplayCommand::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(target: "taskfeed::cli", "Skipping line {}: {}", line_no, e);
                summary.skipped += 1;
                continue;
            }
        };

        debug!(target: "taskfeed::cli", "Line {}: {:?}", line_no, kind_of(&command));
        match command.apply(session) {
            Ok(events) => {
                summary.applied += 1;
                events.iter().for_each(&mut on_event);
            }
            Err(e) => {
                warn!(target: "taskfeed::cli", "Line {} rejected: {}", line_no, e);
                summary.rejected += 1;
            }
        }
    }

    info!(
        target: "taskfeed::cli",
        "Replay finished: {} applied, {} skipped, {} rejected",
        summary.applied,
        summary.skipped,
        summary.rejected
    );
    Ok(summary)
}

/// Replay a recording file.
pub fn run_file<D, F>(session: &mut TaskSession<D>, path: &Path, on_event: F) -> Result<ReplaySummary>
where
    D: IncrementSource,
    F: FnMut(&SessionEvent),
{
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open recording {}", path.display()))?;
    run(session, std::io::BufReader::new(file), on_event)
}

/// Command name without its payload, for logging.
fn kind_of(command: &ReplayCommand) -> &'static str {
    match command {
        ReplayCommand::Update { .. } => "update",
        ReplayCommand::Complete => "complete",
        ReplayCommand::Reset => "reset",
        ReplayCommand::Collapse { .. } => "collapse",
        ReplayCommand::Expand { .. } => "expand",
        ReplayCommand::Toggle { .. } => "toggle",
        ReplayCommand::CollapseAll => "collapse_all",
        ReplayCommand::ExpandAll => "expand_all",
    }
}
