//! # clave
//!
//! A pattern-driven metronome engine. The live scheduler ticks at a fixed
//! musical interval, resolves each beat against a declarative rhythmic
//! pattern (odd meters, multi-bar cycles, layered polyrhythms), plays a
//! synthesized click, and broadcasts tick events to any number of
//! subscribers. The same pattern machinery renders offline to a 16-bit
//! stereo WAV. A tap-tempo estimator rounds out the toolkit.
//!
//! The pure pattern model, registry, and tap estimation live in the
//! `clave-core` crate and are re-exported here.
//!
//! ## Modules
//!
//! - `audio`: click synthesis, the output device, the live metronome, and
//!   the offline renderer.
//!
//! ## Example
//!
//! ```no_run
//! use clave::{Metronome, PatternRegistry};
//!
//! let registry = PatternRegistry::with_builtins();
//! let pattern = registry.lookup("basic")?;
//!
//! let metronome = Metronome::new(120, 4, pattern)?;
//! let events = metronome.subscribe();
//! metronome.start()?;
//!
//! for event in events.iter().take(8) {
//!     println!("bar {} beat {}", event.bar, event.beat);
//! }
//! metronome.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;

pub use audio::metronome::{Metronome, MetronomeError, MetronomeState, TickEvent};
pub use audio::output::{AudioError, AudioOutput};
pub use audio::render::RenderError;
pub use audio::synth::StereoFrame;

// Re-export the pure core
pub use clave_core::{
    builtin_patterns, BeatDefinition, Pattern, PatternError, PatternRegistry, SoundKind,
    TapEstimate, TapTempo,
};
