//! Sound kinds a beat can be voiced with
//!
//! Pure data, shared between the pattern model and the synthesizer in the
//! audio crate. Serialized as lowercase strings to match the persisted
//! pattern format.

use serde::{Deserialize, Serialize};

/// The kind of sound a beat produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    /// Strong beat (downbeat)
    Accent,
    /// Regular beat
    #[default]
    Normal,
    /// Barely-audible filler note
    Ghost,
    /// Ride cymbal voicing
    Ride,
    /// Placeholder slot; the synthesizer voices it with its fallback tone
    Silent,
}

impl SoundKind {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Accent => "accent",
            SoundKind::Normal => "normal",
            SoundKind::Ghost => "ghost",
            SoundKind::Ride => "ride",
            SoundKind::Silent => "silent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_names_are_lowercase() {
        assert_eq!(serde_json::to_string(&SoundKind::Accent).unwrap(), "\"accent\"");
        assert_eq!(serde_json::to_string(&SoundKind::Ride).unwrap(), "\"ride\"");

        let parsed: SoundKind = serde_json::from_str("\"ghost\"").unwrap();
        assert_eq!(parsed, SoundKind::Ghost);
    }

    #[test]
    fn test_name_matches_serde_form() {
        for kind in [
            SoundKind::Accent,
            SoundKind::Normal,
            SoundKind::Ghost,
            SoundKind::Ride,
            SoundKind::Silent,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
