//! Name-keyed pattern registry and the built-in pattern set

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::pattern::PatternError;
use crate::types::{BeatDefinition, Pattern, SoundKind};

/// Registry of named patterns.
///
/// Patterns are handed out behind `Arc` so a running scheduler and the
/// registry can share one immutable instance.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    patterns: BTreeMap<String, Arc<Pattern>>,
}

impl PatternRegistry {
    /// Empty registry
    pub fn new() -> Self {
        PatternRegistry::default()
    }

    /// Registry preloaded with the built-in pattern set
    pub fn with_builtins() -> Self {
        let mut registry = PatternRegistry::new();
        for pattern in builtin_patterns() {
            // Built-in names are unique
            let _ = registry.register(pattern);
        }
        registry
    }

    /// Find a pattern by name
    pub fn lookup(&self, name: &str) -> Result<Arc<Pattern>, PatternError> {
        self.patterns
            .get(name)
            .cloned()
            .ok_or_else(|| PatternError::NotFound(name.to_string()))
    }

    /// Add a pattern under its own name; names must be unique
    pub fn register(&mut self, pattern: Pattern) -> Result<(), PatternError> {
        if self.patterns.contains_key(&pattern.name) {
            return Err(PatternError::AlreadyExists(pattern.name.clone()));
        }
        self.patterns
            .insert(pattern.name.clone(), Arc::new(pattern));
        Ok(())
    }

    /// Map of pattern name to description
    pub fn list(&self) -> BTreeMap<String, String> {
        self.patterns
            .iter()
            .map(|(name, pattern)| (name.clone(), pattern.description.clone()))
            .collect()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.patterns.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn beat(slot: u32, sound: SoundKind, volume: f32) -> BeatDefinition {
    BeatDefinition::new(slot, sound, volume)
}

/// The built-in pattern set: straight and odd meters, a two-bar shuffle,
/// and a 3:4 polyrhythm.
pub fn builtin_patterns() -> Vec<Pattern> {
    vec![
        Pattern::new("basic", "Straight 4/4", 4, vec![
            beat(1, SoundKind::Accent, 1.0).accented().with_comment("downbeat"),
            beat(2, SoundKind::Normal, 0.7),
            beat(3, SoundKind::Normal, 0.7),
            beat(4, SoundKind::Normal, 0.7),
        ]),
        Pattern::new("rock", "Rock groove with kick and snare accents", 4, vec![
            beat(1, SoundKind::Accent, 1.0).accented().with_comment("kick"),
            beat(2, SoundKind::Normal, 0.8).accented().with_comment("snare"),
            beat(3, SoundKind::Accent, 1.0).accented().with_comment("kick"),
            beat(4, SoundKind::Normal, 0.8).accented().with_comment("snare"),
        ]),
        Pattern::new("jazz", "Jazz ride cymbal pattern", 4, vec![
            beat(1, SoundKind::Ride, 0.7).with_comment("ride bell"),
            beat(2, SoundKind::Ride, 0.5).with_comment("ride bow"),
            beat(3, SoundKind::Ride, 0.7).with_comment("ride bell"),
            beat(4, SoundKind::Ride, 0.5).with_comment("ride bow"),
        ]),
        Pattern::new("waltz", "Waltz in 3/4", 3, vec![
            beat(1, SoundKind::Accent, 1.0).accented(),
            beat(2, SoundKind::Normal, 0.6),
            beat(3, SoundKind::Normal, 0.6),
        ]),
        Pattern::new("shuffle", "Two-bar shuffle with a triplet feel", 4, vec![
            beat(1, SoundKind::Accent, 1.0).with_comment("downbeat"),
            beat(2, SoundKind::Ghost, 0.3).with_comment("ghost note"),
            beat(3, SoundKind::Normal, 0.7).with_comment("backbeat"),
            beat(4, SoundKind::Ghost, 0.3),
            beat(5, SoundKind::Accent, 0.9),
            beat(6, SoundKind::Ghost, 0.3),
            beat(7, SoundKind::Normal, 0.8),
            beat(8, SoundKind::Ghost, 0.3),
        ])
        .with_cycle(2),
        Pattern::new("5-4", "Odd meter 5/4", 5, vec![
            beat(1, SoundKind::Accent, 1.0),
            beat(2, SoundKind::Normal, 0.6),
            beat(3, SoundKind::Accent, 0.9),
            beat(4, SoundKind::Normal, 0.6),
            beat(5, SoundKind::Normal, 0.6),
        ]),
        Pattern::new("7-8", "Odd meter 7/8, grouped 3+2+2", 7, vec![
            beat(1, SoundKind::Accent, 1.0),
            beat(2, SoundKind::Normal, 0.6),
            beat(3, SoundKind::Normal, 0.6),
            beat(4, SoundKind::Accent, 0.8),
            beat(5, SoundKind::Normal, 0.6),
            beat(6, SoundKind::Accent, 0.8),
            beat(7, SoundKind::Normal, 0.6),
        ]),
        // 12 slots = lcm(3, 4); the accent layer is listed first and wins
        // the slots both layers share
        Pattern::new("poly", "3:4 polyrhythm over a 12-beat cycle", 12, vec![
            beat(1, SoundKind::Accent, 1.0).with_comment("triplet side, beat 1"),
            beat(4, SoundKind::Accent, 0.8).with_comment("triplet side, beat 2"),
            beat(7, SoundKind::Accent, 0.8).with_comment("triplet side, beat 3"),
            beat(10, SoundKind::Accent, 0.8).with_comment("triplet side, next cycle"),
            beat(1, SoundKind::Ride, 0.6).with_comment("four side, beat 1"),
            beat(4, SoundKind::Ride, 0.5).with_comment("four side, beat 2"),
            beat(7, SoundKind::Ride, 0.5).with_comment("four side, beat 3"),
            beat(10, SoundKind::Ride, 0.5).with_comment("four side, beat 4"),
        ]),
    ]
}
