//! Click-tone synthesis
//!
//! Pure sample generation: a fixed per-sound frequency map, a positional
//! ADSR envelope, and a sine tone duplicated into stereo frames. Both the
//! live scheduler and the offline renderer build their clicks here.

use std::f32::consts::PI;

use clave_core::SoundKind;

/// A single stereo sample frame (left, right)
pub type StereoFrame = [f32; 2];

/// Envelope sustain level
const SUSTAIN_LEVEL: f32 = 0.7;

/// Frequency in Hz used to voice a sound kind.
///
/// `Silent` shares the 440 Hz fallback voice with `Normal`.
pub fn frequency_for(sound: SoundKind) -> f32 {
    match sound {
        SoundKind::Accent => 880.0,
        SoundKind::Ride => 1318.51,
        SoundKind::Normal => 440.0,
        SoundKind::Ghost => 220.0,
        SoundKind::Silent => 440.0,
    }
}

/// Extra gain per sound kind; ghost notes are pulled way down
pub fn level_for(sound: SoundKind) -> f32 {
    match sound {
        SoundKind::Ghost => 0.3,
        _ => 1.0,
    }
}

/// Positional ADSR envelope over a tone of `total` samples: linear attack
/// across the first 10%, decay to the sustain level across the next 20%,
/// constant sustain, then a linear release across the last 10%.
pub fn envelope(position: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let attack = total / 10;
    let decay = total / 5;
    let release = total / 10;

    if position < attack {
        position as f32 / attack as f32
    } else if position < attack + decay {
        let progress = (position - attack) as f32 / decay as f32;
        1.0 - (1.0 - SUSTAIN_LEVEL) * progress
    } else if position < total - release {
        SUSTAIN_LEVEL
    } else {
        let progress = (position - (total - release)) as f32 / release as f32;
        SUSTAIN_LEVEL * (1.0 - progress)
    }
}

/// Number of frames between beat onsets at `bpm`
pub fn beat_interval_samples(bpm: u32, sample_rate: u32) -> usize {
    (sample_rate as f64 * 60.0 / bpm as f64).round() as usize
}

/// Synthesize one enveloped click as stereo frames.
///
/// The mono sine is written identically to both channels. A zero-length
/// request yields an empty buffer.
pub fn synthesize(
    sound: SoundKind,
    volume: f32,
    frames: usize,
    sample_rate: u32,
) -> Vec<StereoFrame> {
    let frequency = frequency_for(sound);
    let volume = volume * level_for(sound);

    let mut out = Vec::with_capacity(frames);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let raw = (2.0 * PI * frequency * t).sin();
        let value = raw * volume * envelope(i, frames);
        out.push([value, value]);
    }
    out
}
