//! Replays of recorded streams through the CLI library.

use std::io::Write;
use std::path::PathBuf;
use taskfeed_cli::render::{render_text, OutputFormat};
use taskfeed_cli::{render, replay};
use taskfeed_core::{SessionConfig, TaskSession};
use taskfeed_types::{EntryView, SessionEvent, SessionStatus};
use tempfile::NamedTempFile;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_restart_recording() {
    let mut session = TaskSession::new(&SessionConfig::default());
    let mut events = Vec::new();
    let summary = replay::run_file(&mut session, &fixture_path("restart.jsonl"), |event| {
        events.push(event.clone())
    })
    .unwrap();

    assert_eq!(summary.applied, 9);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.rejected, 0);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    let titles: Vec<String> = snapshot
        .entries
        .iter()
        .map(|entry| match entry {
            EntryView::Step(step) => step.title.clone(),
            EntryView::Divider { label } => label.clone(),
        })
        .collect();
    assert_eq!(
        titles,
        vec![
            "Plan",
            "I will add the new module first",
            "Running: create_file (src/feed.rs)",
            "Running: update_file (src/lib.rs)",
            "Stream Restarted",
            "Retry",
            "Running: modify_file (src/lib.rs)",
        ]
    );
    assert_eq!(snapshot.files, vec!["src/feed.rs", "src/lib.rs"]);
    assert!(snapshot.steps()[2].collapsed);

    let dividers = events
        .iter()
        .filter(|event| matches!(event, SessionEvent::Divider { .. }))
        .count();
    assert_eq!(dividers, 1);
    assert!(matches!(events.last(), Some(SessionEvent::Completed { .. })));

    let text = render_text(&snapshot);
    assert!(text.contains("[+]   3. tool  Running: create_file (src/feed.rs)"));
    assert!(text.contains("Files changed (2):"));
}

#[test]
fn test_replay_from_temp_file_as_json() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#""<h2>Verify</h2>""#).unwrap();
    writeln!(file, "{{not json").unwrap();
    writeln!(file, r#"{{"type":"collapse_all"}}"#).unwrap();
    file.flush().unwrap();

    let mut session = TaskSession::new(&SessionConfig::default());
    let summary = replay::run_file(&mut session, file.path(), |_| {}).unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.applied, 2);

    let json = render::render(&session.snapshot(), OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "active");
    assert_eq!(value["entries"][0]["type"], "step");
    assert_eq!(value["entries"][0]["title"], "Verify");
    assert_eq!(value["entries"][0]["collapsed"], true);
}

#[test]
fn test_missing_recording_is_an_error() {
    let mut session = TaskSession::new(&SessionConfig::default());
    let result = replay::run_file(&mut session, &fixture_path("absent.jsonl"), |_| {});
    assert!(result.is_err());
}
