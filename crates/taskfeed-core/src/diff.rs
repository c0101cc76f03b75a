//! Incremental diffing of streamed buffer snapshots.
//!
//! The upstream collector only hands us the full buffer so far. New content is
//! inferred from the fragment count of the cleaned buffer, and restarts from
//! its length:
//! - Growth returns the fragments past the cursor
//! - A small shrink is a backspace-style correction and keeps the cursor
//! - A significant shrink is suppressed for one cycle; if the next snapshot is
//!   still short the restart is confirmed and everything is replayed from 0

use crate::config::{DiffConfig, MarkupConfig};
use crate::markup::{split_fragments, strip_noise};
use chrono::{DateTime, Utc};
use taskfeed_types::Fragment;
use tracing::{debug, info, trace};

/// Outcome of observing one buffer snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Fragments not seen before, in order (possibly none)
    Increment { fragments: Vec<Fragment> },
    /// Ambiguous shrink; nothing may be rendered this cycle
    Suppressed,
    /// The stream started over; all fragments of the new buffer
    RestartConfirmed { fragments: Vec<Fragment> },
}

impl Observation {
    pub fn fragments(&self) -> &[Fragment] {
        match self {
            Observation::Increment { fragments } | Observation::RestartConfirmed { fragments } => {
                fragments
            }
            Observation::Suppressed => &[],
        }
    }
}

/// A shrink awaiting confirmation on the next observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRestart {
    /// Buffer length before the shrink was seen
    pub suspected_length: usize,
    pub observed_at: DateTime<Utc>,
}

/// Source of monotone increments from successive buffer snapshots.
///
/// The session only depends on this trait, so a source with explicit offsets
/// can replace the length heuristic without touching classification or the
/// step log.
pub trait IncrementSource {
    fn observe(&mut self, buffer: &str) -> Observation;

    /// Forget all tracking state.
    fn reset(&mut self);
}

/// Length-heuristic increment source with a one-cycle restart debounce.
#[derive(Debug, Clone)]
pub struct StreamDiffEngine {
    config: DiffConfig,
    markup: MarkupConfig,
    /// Number of fragments already handed out
    cursor: usize,
    /// Cleaned length (in characters) of the last processed buffer
    last_buffer_length: usize,
    pending_restart: Option<PendingRestart>,
}

impl Default for StreamDiffEngine {
    fn default() -> Self {
        Self::new(DiffConfig::default(), MarkupConfig::default())
    }
}

impl StreamDiffEngine {
    pub fn new(config: DiffConfig, markup: MarkupConfig) -> Self {
        Self {
            config,
            markup,
            cursor: 0,
            last_buffer_length: 0,
            pending_restart: None,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_buffer_length(&self) -> usize {
        self.last_buffer_length
    }

    pub fn pending_restart(&self) -> Option<&PendingRestart> {
        self.pending_restart.as_ref()
    }

    fn is_significant_shrink(&self, len: usize) -> bool {
        (len as f64) < self.config.shrink_ratio * self.last_buffer_length as f64
            || len < self.config.min_significant_len
    }

    /// Parse the cleaned buffer, hand out everything past the cursor and
    /// advance the cursor over it.
    fn advance(&mut self, cleaned: &str, len: usize) -> Vec<Fragment> {
        let mut fragments = split_fragments(cleaned, self.config.min_text_chars);
        if self.cursor > fragments.len() {
            debug!(
                target: "taskfeed::diff",
                "Clamping cursor {} to {} fragments",
                self.cursor,
                fragments.len()
            );
            self.cursor = fragments.len();
        }
        let fresh = fragments.split_off(self.cursor);
        self.cursor += fresh.len();
        self.last_buffer_length = len;
        trace!(
            target: "taskfeed::diff",
            "Advanced: {} new fragments, cursor={}, length={}",
            fresh.len(),
            self.cursor,
            len
        );
        fresh
    }
}

impl IncrementSource for StreamDiffEngine {
    fn observe(&mut self, buffer: &str) -> Observation {
        let cleaned = strip_noise(buffer, &self.markup);
        let len = cleaned.chars().count();

        // A pending restart never survives past this call
        if let Some(pending) = self.pending_restart.take() {
            if (len as f64) < self.config.confirm_ratio * pending.suspected_length as f64 {
                info!(
                    target: "taskfeed::diff",
                    "Stream restart confirmed: length {} after {} (suspected at {})",
                    len,
                    pending.suspected_length,
                    pending.observed_at
                );
                self.cursor = 0;
                self.last_buffer_length = 0;
                let fragments = self.advance(&cleaned, len);
                return Observation::RestartConfirmed { fragments };
            }
            debug!(
                target: "taskfeed::diff",
                "Shrink recovered: length {} vs suspected {}",
                len,
                pending.suspected_length
            );
            return Observation::Increment {
                fragments: self.advance(&cleaned, len),
            };
        }

        if len < self.last_buffer_length {
            if self.is_significant_shrink(len) {
                debug!(
                    target: "taskfeed::diff",
                    "Significant shrink {} -> {}, suppressing one cycle",
                    self.last_buffer_length,
                    len
                );
                self.pending_restart = Some(PendingRestart {
                    suspected_length: self.last_buffer_length,
                    observed_at: Utc::now(),
                });
                return Observation::Suppressed;
            }
            trace!(
                target: "taskfeed::diff",
                "Minor shrink {} -> {}",
                self.last_buffer_length,
                len
            );
        }

        Observation::Increment {
            fragments: self.advance(&cleaned, len),
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.last_buffer_length = 0;
        self.pending_restart = None;
    }
}
