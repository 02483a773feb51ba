//! # clave-core
//!
//! Pure core library for the clave metronome: the rhythmic pattern model
//! and resolver, the name-keyed pattern registry with its built-in set,
//! JSON persistence, and tap-tempo estimation. No audio or timing
//! dependencies, so it can be embedded where the audio engine cannot.
//!
//! ## Example
//!
//! ```
//! use clave_core::PatternRegistry;
//!
//! let registry = PatternRegistry::with_builtins();
//! let basic = registry.lookup("basic")?;
//! let (_sound, volume) = basic.resolve(1, 1);
//! assert_eq!(volume, 1.0);
//! # Ok::<(), clave_core::PatternError>(())
//! ```

pub mod registry;
pub mod tap;
pub mod types;

// Re-export commonly used types
pub use registry::{builtin_patterns, PatternRegistry};
pub use tap::{TapEstimate, TapTempo};
pub use types::{BeatDefinition, Pattern, PatternError, SoundKind};
