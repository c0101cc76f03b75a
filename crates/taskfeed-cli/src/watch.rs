//! Following a live buffer file.
//!
//! The watched file always holds the cumulative buffer, rewritten in place by
//! whatever captures the stream. Each modification re-reads the whole file
//! and feeds it to the session. File notifications arrive on a notify thread
//! and are funneled through a channel into the single task that owns the
//! session.

use anyhow::{Context, Result};
use notify::{
    event::{AccessKind, AccessMode, ModifyKind},
    Event, EventKind, RecursiveMode, Watcher,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use taskfeed_core::{IncrementSource, TaskSession};
use taskfeed_types::SessionEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Re-reads the buffer file and forwards changed contents to a session.
#[derive(Debug)]
pub struct BufferFollower {
    path: PathBuf,
    last_content: Option<String>,
}

impl BufferFollower {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_content: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and update the session if the content changed.
    ///
    /// A missing file is not an error: writers often replace the file
    /// through a rename.
    pub fn poll<D: IncrementSource>(
        &mut self,
        session: &mut TaskSession<D>,
    ) -> Result<Vec<SessionEvent>> {
        if !self.path.exists() {
            trace!(target: "taskfeed::watch", "Buffer file {} not present", self.path.display());
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read buffer file {}", self.path.display()))?;
        if self.last_content.as_deref() == Some(content.as_str()) {
            return Ok(Vec::new());
        }

        debug!(
            target: "taskfeed::watch",
            "Buffer file changed ({} bytes)",
            content.len()
        );
        let events = session.update(&content)?;
        self.last_content = Some(content);
        Ok(events)
    }
}

fn should_read(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

/// Follow `path` until `shutdown` resolves, then complete the session.
///
/// The parent directory is watched rather than the file itself so that
/// atomic replacements are seen.
pub async fn run_until<D, S, F>(
    path: &Path,
    session: &mut TaskSession<D>,
    shutdown: S,
    mut on_event: F,
) -> Result<()>
where
    D: IncrementSource,
    S: Future<Output = ()>,
    F: FnMut(&SessionEvent),
{
    let mut follower = BufferFollower::new(path);
    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let mut file_watcher =
        notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = notify_tx.send(event);
            }
        })
        .context("Failed to create file watcher")?;
    file_watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

    info!(target: "taskfeed::watch", "Following {}", path.display());

    // Content present before the watcher started
    for event in &follower.poll(session)? {
        on_event(event);
    }

    let file_name = path.file_name().map(|name| name.to_os_string());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = notify_rx.recv() => {
                let relevant = should_read(&event)
                    && event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !relevant {
                    continue;
                }
                match follower.poll(session) {
                    Ok(events) => events.iter().for_each(&mut on_event),
                    Err(e) => {
                        warn!(target: "taskfeed::watch", "Failed to process buffer update: {}", e);
                        if session.is_completed() {
                            break;
                        }
                    }
                }
            }
            _ = &mut shutdown => {
                debug!(target: "taskfeed::watch", "Shutdown requested");
                break;
            }
            else => {
                break;
            }
        }
    }

    drop(file_watcher);
    for event in &session.complete() {
        on_event(event);
    }
    info!(target: "taskfeed::watch", "Stopped following {}", path.display());
    Ok(())
}

/// Follow `path` until Ctrl-C.
pub async fn run<D, F>(path: &Path, session: &mut TaskSession<D>, on_event: F) -> Result<()>
where
    D: IncrementSource,
    F: FnMut(&SessionEvent),
{
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "taskfeed::watch", "Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_until(path, session, ctrl_c, on_event).await
}
