//! Rhythmic pattern model and beat resolution
//!
//! A `Pattern` assigns sounds and volumes to beat positions. Patterns are
//! immutable once registered; schedulers hold them behind `Arc` so swapping
//! the active pattern is a handle replacement, never an in-place edit.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::sound::SoundKind;

/// Sound used for beats no definition matches
pub const DEFAULT_SOUND: SoundKind = SoundKind::Normal;
/// Volume used for beats no definition matches
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Errors from pattern lookup, registration, and persistence
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern '{0}' not found")]
    NotFound(String),
    #[error("pattern '{0}' already exists")]
    AlreadyExists(String),
    #[error("pattern file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid pattern JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry in a pattern: the sound to fire when the beat counter hits
/// `beat_slot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDefinition {
    /// Beat position this entry matches. May exceed the pattern's
    /// `beats_per_bar` to address positions in later bars of a multi-bar
    /// cycle.
    pub beat_slot: u32,
    pub sound_kind: SoundKind,
    /// Nominal range 0.0-1.0; not clamped here
    pub volume: f32,
    /// Subdivision hint (triplets and the like); presentational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdiv: Option<u32>,
    /// Accent marker for display purposes
    #[serde(default, skip_serializing_if = "is_false")]
    pub accent: bool,
    /// Free-text note for the musician
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl BeatDefinition {
    pub fn new(beat_slot: u32, sound_kind: SoundKind, volume: f32) -> Self {
        BeatDefinition {
            beat_slot,
            sound_kind,
            volume,
            subdiv: None,
            accent: false,
            comment: None,
        }
    }

    /// Mark this beat as accented (display only)
    pub fn accented(mut self) -> Self {
        self.accent = true;
        self
    }

    /// Attach a free-text note
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// A named rhythmic pattern: per-beat sound assignments plus an optional
/// multi-bar cycle length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Nominal meter numerator
    pub beats_per_bar: u32,
    /// Bars after which the slot numbering repeats; 0 means every bar is
    /// identical
    #[serde(default)]
    pub cycle_length: u32,
    /// Ordered beat definitions; on duplicate slots the earliest entry wins
    #[serde(default)]
    pub beats: Vec<BeatDefinition>,
}

impl Pattern {
    pub fn new(
        name: &str,
        description: &str,
        beats_per_bar: u32,
        beats: Vec<BeatDefinition>,
    ) -> Self {
        Pattern {
            name: name.to_string(),
            description: description.to_string(),
            beats_per_bar,
            cycle_length: 0,
            beats,
        }
    }

    /// Make the pattern repeat over `bars` bars
    pub fn with_cycle(mut self, bars: u32) -> Self {
        self.cycle_length = bars;
        self
    }

    /// Resolve the sound and volume for a beat.
    ///
    /// `beat` and `bar` are 1-based. The scan is ordered and the first
    /// entry whose `beat_slot` equals `beat` wins; duplicate slots layer
    /// polyrhythms, and the tie-break keeps them deterministic. Beats with
    /// no matching entry fall back to a normal click at volume 0.7.
    ///
    /// Matching is keyed on the raw beat number only. The cycle-relative
    /// bar is computed for cyclic patterns but does not participate in the
    /// lookup, so `cycle_length` matters exactly when slot values exceed
    /// `beats_per_bar` (as in the shuffle and polyrhythm built-ins).
    pub fn resolve(&self, beat: u32, bar: u32) -> (SoundKind, f32) {
        let _cycle_bar = if self.cycle_length > 0 {
            bar.saturating_sub(1) % self.cycle_length + 1
        } else {
            bar
        };

        for def in &self.beats {
            if def.beat_slot == beat {
                return (def.sound_kind, def.volume);
            }
        }

        (DEFAULT_SOUND, DEFAULT_VOLUME)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, PatternError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a pattern from its JSON form. Missing optional fields take
    /// their defaults: empty description, no cycle, no beats.
    pub fn from_json(json: &str) -> Result<Pattern, PatternError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the pattern to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PatternError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a pattern from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Pattern, PatternError> {
        Pattern::from_json(&fs::read_to_string(path)?)
    }
}
