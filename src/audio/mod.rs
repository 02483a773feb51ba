pub mod metronome;
pub mod output;
pub mod render;
pub mod synth;

// Re-export the main entry points
pub use metronome::{Metronome, MetronomeError, MetronomeState, TickEvent};
pub use output::{AudioError, AudioOutput};
