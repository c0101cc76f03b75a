//! Session configuration.
//!
//! Every threshold the diff engine uses is configuration rather than a
//! constant; the defaults are empirical and should be calibrated against
//! recorded streams.

use crate::{Result, TaskfeedError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a recognized marker (tag name or class token) means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerEffect {
    /// Marks a tool invocation card
    Tool,
    /// Marks a phase/section header
    Phase,
    /// Noise: the whole element is removed before measuring the buffer
    Strip,
}

/// Thresholds for the length-based restart heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// A shrink below `shrink_ratio * previous length` is significant
    #[serde(default = "default_ratio")]
    pub shrink_ratio: f64,
    /// A shrink to fewer than this many characters is significant
    #[serde(default = "default_min_significant_len")]
    pub min_significant_len: usize,
    /// After suppression, a length below `confirm_ratio * suspected length`
    /// confirms the restart
    #[serde(default = "default_ratio")]
    pub confirm_ratio: f64,
    /// Text runs with fewer non-whitespace characters are not fragments
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

fn default_ratio() -> f64 {
    0.8
}

fn default_min_significant_len() -> usize {
    100
}

fn default_min_text_chars() -> usize {
    3
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            shrink_ratio: default_ratio(),
            min_significant_len: default_min_significant_len(),
            confirm_ratio: default_ratio(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

/// Recognized markup identities and noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Marker name (tag or class token) to effect
    #[serde(default = "default_markers")]
    pub markers: BTreeMap<String, MarkerEffect>,
    /// Fixed boilerplate phrases removed from the buffer
    #[serde(default = "default_noise_phrases")]
    pub noise_phrases: Vec<String>,
}

fn default_markers() -> BTreeMap<String, MarkerEffect> {
    BTreeMap::from([
        ("tool-card".to_string(), MarkerEffect::Tool),
        ("file-edit-card".to_string(), MarkerEffect::Tool),
        ("tool-definitions".to_string(), MarkerEffect::Strip),
    ])
}

fn default_noise_phrases() -> Vec<String> {
    vec!["Copy code".to_string()]
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            markers: default_markers(),
            noise_phrases: default_noise_phrases(),
        }
    }
}

impl MarkupConfig {
    /// Marker names with the given effect, in stable order.
    pub fn markers_with(&self, effect: MarkerEffect) -> Vec<&str> {
        self.markers
            .iter()
            .filter(|(_, e)| **e == effect)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Which tool names count as file mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTrackerConfig {
    /// Case-insensitive substrings of a tool name
    #[serde(default = "default_file_actions")]
    pub actions: Vec<String>,
}

fn default_file_actions() -> Vec<String> {
    vec!["create".to_string(), "update".to_string(), "modify".to_string()]
}

impl Default for FileTrackerConfig {
    fn default() -> Self {
        Self {
            actions: default_file_actions(),
        }
    }
}

/// Complete configuration of a task session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
    #[serde(default)]
    pub files: FileTrackerConfig,
}

impl SessionConfig {
    /// Reject thresholds that would make the restart heuristic meaningless.
    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [
            ("diff.shrink_ratio", self.diff.shrink_ratio),
            ("diff.confirm_ratio", self.diff.confirm_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(TaskfeedError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if self
            .markup
            .markers
            .keys()
            .any(|name| name.trim().is_empty() || name.contains(char::is_whitespace))
        {
            return Err(TaskfeedError::InvalidConfig(
                "markup.markers names must be single non-empty tokens".to_string(),
            ));
        }
        if self.markup.noise_phrases.iter().any(|p| p.is_empty()) {
            return Err(TaskfeedError::InvalidConfig(
                "markup.noise_phrases must not contain empty phrases".to_string(),
            ));
        }
        Ok(())
    }
}
