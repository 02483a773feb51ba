//! Offline rendering of a pattern to WAV
//!
//! Walks beat boundaries at sample resolution with the same wrap rule as
//! the live scheduler, synthesizes each click into a stereo buffer, and
//! encodes 16-bit PCM, either to bytes in memory or straight to a file.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

use clave_core::Pattern;

use crate::audio::metronome::{advance_beat, validate_beats_per_bar, validate_bpm, MetronomeError};
use crate::audio::synth::{self, StereoFrame};

/// Sample rate of rendered audio
pub const RENDER_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Invalid(#[from] MetronomeError),
    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// File name used when the caller does not pick one
pub fn default_filename(bpm: u32, pattern_name: &str) -> String {
    format!("metronome_{bpm}bpm_{pattern_name}.wav")
}

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Render the pattern into raw stereo frames.
///
/// The buffer holds exactly `sample_rate * duration_secs` frames. A beat
/// fires wherever the frame index is a multiple of
/// `round(sample_rate * 60 / bpm)`; each beat's click spans a tenth of
/// that interval and overwrites the buffer, clipped at the end.
pub fn render_frames(
    pattern: &Pattern,
    bpm: u32,
    beats_per_bar: u32,
    duration_secs: u32,
    sample_rate: u32,
) -> Result<Vec<StereoFrame>, RenderError> {
    validate_bpm(bpm)?;
    validate_beats_per_bar(beats_per_bar)?;

    let total = sample_rate as usize * duration_secs as usize;
    let interval = synth::beat_interval_samples(bpm, sample_rate);
    let mut frames = vec![[0.0f32; 2]; total];

    let mut beat = 0;
    let mut bar = 1;
    let mut onset = 0usize;
    while onset < total {
        let advanced = advance_beat(beat, bar, beats_per_bar);
        beat = advanced.0;
        bar = advanced.1;

        let (sound, volume) = pattern.resolve(beat, bar);
        let click = synth::synthesize(sound, volume, interval / 10, sample_rate);
        for (i, frame) in click.into_iter().enumerate() {
            match frames.get_mut(onset + i) {
                Some(slot) => *slot = frame,
                None => break,
            }
        }

        onset += interval;
    }

    Ok(frames)
}

/// Render and encode to an in-memory WAV at [`RENDER_SAMPLE_RATE`]
pub fn render(
    pattern: &Pattern,
    bpm: u32,
    beats_per_bar: u32,
    duration_secs: u32,
) -> Result<Vec<u8>, RenderError> {
    let frames = render_frames(pattern, bpm, beats_per_bar, duration_secs, RENDER_SAMPLE_RATE)?;
    encode_wav(&frames, RENDER_SAMPLE_RATE)
}

/// Encode stereo frames as 16-bit PCM WAV bytes
pub fn encode_wav(frames: &[StereoFrame], sample_rate: u32) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    let mut writer = WavWriter::new(Cursor::new(&mut bytes), wav_spec(sample_rate))?;
    for frame in frames {
        writer.write_sample(to_i16(frame[0]))?;
        writer.write_sample(to_i16(frame[1]))?;
    }
    writer.finalize()?;
    Ok(bytes)
}

/// Render straight to a WAV file.
///
/// File creation and write failures surface as [`RenderError::Encode`]
/// with the underlying cause; rendering is idempotent, so the caller can
/// simply re-invoke.
pub fn render_to_file(
    pattern: &Pattern,
    bpm: u32,
    beats_per_bar: u32,
    duration_secs: u32,
    path: impl AsRef<Path>,
) -> Result<(), RenderError> {
    let frames = render_frames(pattern, bpm, beats_per_bar, duration_secs, RENDER_SAMPLE_RATE)?;
    let mut writer = WavWriter::create(path, wav_spec(RENDER_SAMPLE_RATE))?;
    for frame in frames {
        writer.write_sample(to_i16(frame[0]))?;
        writer.write_sample(to_i16(frame[1]))?;
    }
    writer.finalize()?;
    Ok(())
}
