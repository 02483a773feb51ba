//! Audio output device
//!
//! Owns a cpal output stream and mixes queued click buffers into its
//! callback. The handle is constructed explicitly and passed to whatever
//! needs to play sound; dropping it releases the device. cpal streams are
//! not `Send`, so the stream itself lives on a worker thread for the
//! lifetime of the handle.

use std::sync::{Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;
use tracing::warn;

use crate::audio::synth::StereoFrame;

/// Upper bound on queued clicks; the oldest is evicted when exceeded
const MAX_VOICES: usize = 8;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("audio worker thread terminated")]
    WorkerGone,
}

/// A click currently being mixed into the output
struct Voice {
    frames: Vec<StereoFrame>,
    position: usize,
}

#[derive(Default)]
struct Mixer {
    voices: Vec<Voice>,
}

impl Mixer {
    /// Mix the next output frame from all active voices
    fn next_frame(&mut self) -> StereoFrame {
        let mut left = 0.0;
        let mut right = 0.0;
        for voice in &mut self.voices {
            if let Some(frame) = voice.frames.get(voice.position) {
                left += frame[0];
                right += frame[1];
                voice.position += 1;
            }
        }
        self.voices.retain(|v| v.position < v.frames.len());
        [left, right]
    }

    fn push(&mut self, frames: Vec<StereoFrame>) {
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(Voice { frames, position: 0 });
    }
}

/// Handle to an open audio output device
pub struct AudioOutput {
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: u32,
    // Dropping this disconnects the worker, which tears the stream down
    _shutdown_tx: Sender<()>,
}

impl AudioOutput {
    /// Open the default output device with its default configuration.
    pub fn new() -> Result<Self, AudioError> {
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let (ready_tx, ready_rx) = bounded::<Result<u32, AudioError>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let worker_mixer = Arc::clone(&mixer);
        thread::spawn(move || run_stream(worker_mixer, ready_tx, shutdown_rx));

        let sample_rate = ready_rx.recv().map_err(|_| AudioError::WorkerGone)??;
        Ok(AudioOutput {
            mixer,
            sample_rate,
            _shutdown_tx: shutdown_tx,
        })
    }

    /// Sample rate the device negotiated
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Queue a click for playback and return immediately.
    ///
    /// At most a handful of clicks are held at once; when the queue is
    /// full the oldest is evicted rather than blocking the caller.
    pub fn play(&self, frames: Vec<StereoFrame>) -> Result<(), AudioError> {
        if frames.is_empty() {
            return Ok(());
        }
        let mut mixer = self.mixer.lock().map_err(|_| AudioError::WorkerGone)?;
        mixer.push(frames);
        Ok(())
    }
}

/// Worker: build the stream, report readiness, then hold the stream alive
/// until the handle is dropped.
fn run_stream(
    mixer: Arc<Mutex<Mixer>>,
    ready_tx: Sender<Result<u32, AudioError>>,
    shutdown_rx: Receiver<()>,
) {
    let stream = match build_output(mixer) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    // Blocks until every sender is gone, i.e. the handle was dropped
    let _ = shutdown_rx.recv();
    drop(stream);
}

fn build_output(mixer: Arc<Mutex<Mixer>>) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
    let config = device.default_output_config()?;

    let sample_format = config.sample_format();
    let config: StreamConfig = config.into();
    let sample_rate = config.sample_rate.0;

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
        other => return Err(AudioError::UnsupportedFormat(other)),
    };
    stream.play()?;

    Ok((stream, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<cpal::Stream, AudioError>
where
    T: Sample + SizedSample + Send + 'static + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = |err| warn!("output stream error: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut mixer = match mixer.lock() {
                Ok(mixer) => mixer,
                Err(_) => return,
            };
            for frame in data.chunks_mut(channels) {
                let [left, right] = mixer.next_frame();
                for (i, sample) in frame.iter_mut().enumerate() {
                    let value = if i % 2 == 0 { left } else { right };
                    *sample = cpal::Sample::from_sample(value);
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
