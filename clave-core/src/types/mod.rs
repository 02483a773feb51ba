// clave-core/src/types/mod.rs

pub mod pattern;
pub mod sound;

pub use pattern::{BeatDefinition, Pattern, PatternError, DEFAULT_SOUND, DEFAULT_VOLUME};
pub use sound::SoundKind;
