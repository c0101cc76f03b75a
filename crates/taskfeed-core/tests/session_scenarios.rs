//! End-to-end scenarios driving a task session with streamed buffers.

use proptest::prelude::*;
use taskfeed_core::{ContentClassifier, SessionConfig, TaskSession, TaskfeedError, split_fragments};
use taskfeed_types::{LogEntry, SessionEvent, SessionStatus, StepKind};

fn session() -> TaskSession {
    TaskSession::new(&SessionConfig::default())
}

/// `count` paragraphs padded with trailing text to exactly `len` characters.
fn buffer_of(count: usize, len: usize) -> String {
    let mut out: String = (0..count).map(|i| format!("<p>item {}</p>", i)).collect();
    assert!(out.len() <= len);
    out.push_str(&"x".repeat(len - out.len()));
    out
}

fn paragraphs(count: usize) -> String {
    (0..count)
        .map(|i| format!("<p>Paragraph number {} reporting in</p>", i))
        .collect()
}

#[test]
fn test_phase_then_tool_card() {
    let mut session = session();
    session.update("# Plan\n").unwrap();
    session
        .update("# Plan\n<tool-card data-tool-name=\"create_file\" data-path=\"src/x.ts\">...</tool-card>")
        .unwrap();

    let steps: Vec<_> = session.steps().steps().collect();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].kind, StepKind::Phase);
    assert_eq!(steps[0].title, "Plan");
    assert_eq!(steps[1].kind, StepKind::Tool);
    assert_eq!(steps[1].title, "Running: create_file (src/x.ts)");
    assert_eq!(session.files().list(), ["src/x.ts"]);
}

#[test]
fn test_minor_shrink_adds_no_divider() {
    let mut session = session();
    session.update(&buffer_of(5, 1000)).unwrap();
    let before = session.steps().len();

    let events = session.update(&buffer_of(5, 950)).unwrap();
    assert!(events.is_empty());
    assert_eq!(session.steps().len(), before);
    assert_eq!(session.steps().divider_count(), 0);
}

#[test]
fn test_confirmed_restart_keeps_history() {
    let mut session = session();
    session.update(&buffer_of(5, 1000)).unwrap();
    let before: Vec<String> = session.steps().steps().map(|s| s.id.clone()).collect();
    assert_eq!(before.len(), 6);

    assert!(session.update(&buffer_of(2, 400)).unwrap().is_empty());
    let events = session.update(&buffer_of(2, 350)).unwrap();

    assert_eq!(session.steps().divider_count(), 1);
    assert!(matches!(events[0], SessionEvent::Divider { .. }));
    assert_eq!(events.len(), 4);

    let entries = session.steps().entries();
    let kept: Vec<String> = entries[..6]
        .iter()
        .filter_map(LogEntry::as_step)
        .map(|s| s.id.clone())
        .collect();
    assert_eq!(kept, before);
    assert!(entries[6].is_divider());
    let sequences: Vec<u64> = session.steps().steps().map(|s| s.sequence).collect();
    assert_eq!(sequences, (1..=9).collect::<Vec<_>>());
}

#[test]
fn test_collapse_is_idempotent() {
    let mut session = session();
    session.update("<p>first step here</p>").unwrap();
    let id = session.steps().by_sequence(1).unwrap().id.clone();
    session.collapse(&id).unwrap();
    session.collapse(&id).unwrap();
    assert!(session.steps().get(&id).unwrap().collapsed);
    session.expand(&id).unwrap();
    assert!(!session.steps().get(&id).unwrap().collapsed);
}

#[test]
fn test_file_paths_deduplicated() {
    let mut session = session();
    let first = r#"<tool-card data-tool-name="create_file" data-path="src/a.ts"></tool-card>"#;
    let second = r#"<tool-card data-tool-name="update_file" data-path="src%2Fa.ts"></tool-card>"#;
    session.update(first).unwrap();
    let events = session.update(&format!("{}{}", first, second)).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(session.files().list(), ["src/a.ts"]);
}

#[test]
fn test_update_after_completion() {
    let mut session = session();
    session.update("<p>working on it</p>").unwrap();
    session.complete();
    assert_eq!(session.status(), SessionStatus::Completed);

    let result = session.update("<p>working on it</p><p>more work</p>");
    assert_eq!(result, Err(TaskfeedError::SessionClosed(session.id())));
    assert_eq!(session.steps().len(), 1);
}

#[test]
fn test_reset_starts_fresh() {
    let mut session = session();
    session.update(&paragraphs(3)).unwrap();
    session.reset();
    assert!(session.steps().is_empty());

    session.update(&paragraphs(1)).unwrap();
    assert_eq!(session.steps().len(), 1);
    assert_eq!(session.steps().divider_count(), 0);
}

#[test]
fn test_snapshot_serializes() {
    let mut session = session();
    session.update("## Build\n").unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.steps()[0].title, "Build");
    assert_eq!(snapshot.status, SessionStatus::Active);
    assert!(snapshot.completed_at.is_none());
}

fn titles<D: taskfeed_core::IncrementSource>(session: &TaskSession<D>) -> Vec<String> {
    session.steps().steps().map(|s| s.title.clone()).collect()
}

#[test]
fn test_boilerplate_phrase_split_across_updates() {
    let mut session = session();
    session.update("<pre>fn main() {}</pre>Copy co").unwrap();
    assert_eq!(titles(&session), vec!["fn main() {}"]);

    session
        .update("<pre>fn main() {}</pre>Copy code<p>Next I will edit the file</p>")
        .unwrap();
    assert_eq!(
        titles(&session),
        vec!["fn main() {}", "Next I will edit the file"]
    );
    assert!(session.diff_engine().pending_restart().is_none());
}

#[test]
fn test_echo_block_split_across_updates() {
    let mut session = session();
    let head = "<p>Looking at the repo</p>";
    let echo = format!("<tool-definitions>{}", "d".repeat(300));
    let snapshots = [
        format!("{}<tool-defin", head),
        format!("{}{}", head, echo),
        format!("{}{}</tool-defin", head, echo),
        format!("{}{}</tool-definitions><p>Editing the parser now</p>", head, echo),
    ];
    for snapshot in &snapshots {
        assert!(session.update(snapshot).is_ok());
        assert!(session.diff_engine().pending_restart().is_none());
    }

    assert_eq!(
        titles(&session),
        vec!["Looking at the repo", "Editing the parser now"]
    );
    assert_eq!(session.steps().divider_count(), 0);
}

#[test]
fn test_noise_streamed_in_small_pieces_matches_one_shot() {
    let pieces = [
        "<p>Reading the config first</p>",
        "<pre>let x = 1;</pre>",
        "C",
        "op",
        "y",
        " co",
        "de",
        "<tool-def",
        "initions>echo of the tool list",
        "</tool-definitions>",
        "<tool-card data-tool-name=\"update_file\" data-path=\"src/a.rs\">ok</tool-card>",
        "<p>Done with the change</p>",
    ];

    let mut streamed = session();
    let mut buffer = String::new();
    for piece in pieces {
        buffer.push_str(piece);
        streamed.update(&buffer).unwrap();
    }

    let mut one_shot = session();
    one_shot.update(&buffer).unwrap();

    assert_eq!(titles(&streamed), titles(&one_shot));
    assert_eq!(
        titles(&streamed),
        vec![
            "Reading the config first",
            "let x = 1;",
            "Running: update_file (src/a.rs)",
            "Done with the change",
        ]
    );
    assert_eq!(streamed.files().list(), ["src/a.rs"]);
}

proptest! {
    #[test]
    fn test_growing_buffer_appends_in_order(mut counts in prop::collection::vec(0usize..12, 1..20)) {
        counts.sort_unstable();
        let mut session = session();
        for count in &counts {
            session.update(&paragraphs(*count)).unwrap();
        }

        let max = *counts.last().unwrap();
        let steps: Vec<_> = session.steps().steps().collect();
        prop_assert_eq!(steps.len(), max);
        prop_assert_eq!(session.steps().divider_count(), 0);
        for (i, step) in steps.iter().enumerate() {
            prop_assert_eq!(step.sequence, i as u64 + 1);
            prop_assert_eq!(step.title.clone(), format!("Paragraph number {} reporting in", i));
        }
    }

    #[test]
    fn test_classification_is_deterministic(text in "[a-zA-Z #.!]{3,60}") {
        let classifier = ContentClassifier::default();
        for fragment in split_fragments(&text, 3) {
            prop_assert_eq!(classifier.classify(&fragment), classifier.classify(&fragment));
        }
    }
}
