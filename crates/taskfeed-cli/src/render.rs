//! Rendering of session snapshots and events for the terminal.

use std::fmt::Write;
use taskfeed_types::{EntryView, SessionEvent, SessionSnapshot};

/// Output format for the final log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

pub fn render(snapshot: &SessionSnapshot, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(snapshot)),
        OutputFormat::Json => serde_json::to_string_pretty(snapshot),
    }
}

/// Human-readable progress log. Collapsed steps show `[+]`, expanded `[-]`.
pub fn render_text(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Session {} ({}, started {})",
        snapshot.session_id,
        snapshot.status,
        snapshot.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for entry in &snapshot.entries {
        match entry {
            EntryView::Step(step) => {
                let marker = if step.collapsed { "[+]" } else { "[-]" };
                let _ = writeln!(
                    out,
                    "{} {:>3}. {:<5} {}",
                    marker,
                    step.sequence,
                    step.kind.as_str(),
                    step.title
                );
            }
            EntryView::Divider { label } => {
                let _ = writeln!(out, "---------- {} ----------", label);
            }
        }
    }

    if !snapshot.files.is_empty() {
        let _ = writeln!(out, "Files changed ({}):", snapshot.files.len());
        for path in &snapshot.files {
            let _ = writeln!(out, "  {}", path);
        }
    }
    out
}

/// One event as a single JSON line.
pub fn render_event(event: &SessionEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}
