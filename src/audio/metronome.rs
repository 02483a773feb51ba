//! Live metronome scheduler
//!
//! Drives a fixed-period beat tick on its own thread, resolves each beat
//! against the active pattern, plays the click best-effort, and broadcasts
//! tick events to subscribers over bounded channels.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, warn};

use clave_core::{Pattern, SoundKind};

use crate::audio::output::AudioOutput;
use crate::audio::synth;

/// Valid tempo range in beats per minute
pub const BPM_RANGE: std::ops::RangeInclusive<u32> = 20..=300;
/// Valid beats-per-bar range
pub const BEATS_PER_BAR_RANGE: std::ops::RangeInclusive<u32> = 1..=32;
/// Buffered events per subscriber; publishes beyond this are dropped
const SUBSCRIBER_BUFFER: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetronomeError {
    #[error("BPM must be between 20 and 300, got {0}")]
    InvalidBpm(u32),
    #[error("beats per bar must be between 1 and 32, got {0}")]
    InvalidBeatsPerBar(u32),
    #[error("metronome is already running")]
    AlreadyRunning,
}

/// One beat fired by the scheduler
#[derive(Debug, Clone)]
pub struct TickEvent {
    /// 1-based beat within the bar
    pub beat: u32,
    /// 1-based bar number, increasing without bound
    pub bar: u32,
    pub sound: SoundKind,
    pub volume: f32,
    pub timestamp: Instant,
}

/// Typed snapshot of the scheduler state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetronomeState {
    pub bpm: u32,
    pub beats_per_bar: u32,
    pub running: bool,
    pub current_beat: u32,
    pub current_bar: u32,
    pub pattern_name: String,
}

/// State shared between the control surface and the tick thread, guarded
/// by one exclusive lock.
struct Shared {
    bpm: u32,
    beats_per_bar: u32,
    running: bool,
    beat: u32,
    bar: u32,
    pattern: Arc<Pattern>,
    subscribers: Vec<Sender<TickEvent>>,
    // Dropping the sender tells the tick thread to exit
    stop_tx: Option<Sender<()>>,
    // Distinguishes the current tick thread from stale ones across restarts
    epoch: u64,
}

/// A pattern-driven metronome.
///
/// Construction validates tempo and meter; an out-of-range metronome
/// cannot exist. All control methods are safe to call from any thread.
pub struct Metronome {
    shared: Arc<Mutex<Shared>>,
    output: Option<Arc<AudioOutput>>,
}

impl std::fmt::Debug for Metronome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metronome")
            .field("has_output", &self.output.is_some())
            .finish()
    }
}

impl Metronome {
    /// Create a stopped metronome.
    pub fn new(
        bpm: u32,
        beats_per_bar: u32,
        pattern: Arc<Pattern>,
    ) -> Result<Self, MetronomeError> {
        validate_bpm(bpm)?;
        validate_beats_per_bar(beats_per_bar)?;

        Ok(Metronome {
            shared: Arc::new(Mutex::new(Shared {
                bpm,
                beats_per_bar,
                running: false,
                beat: 0,
                bar: 1,
                pattern,
                subscribers: Vec::new(),
                stop_tx: None,
                epoch: 0,
            })),
            output: None,
        })
    }

    /// Attach an audio output; each tick's click is played through it
    /// best-effort. A failing output is logged and never stops the beat.
    pub fn with_output(mut self, output: Arc<AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Start ticking at `60 / bpm` second intervals.
    ///
    /// Resets the beat counter to 0 and the bar counter to 1. Fails with
    /// [`MetronomeError::AlreadyRunning`] when already started.
    pub fn start(&self) -> Result<(), MetronomeError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.running {
            return Err(MetronomeError::AlreadyRunning);
        }
        shared.running = true;
        shared.beat = 0;
        shared.bar = 1;
        shared.epoch += 1;

        let interval = Duration::from_secs_f64(60.0 / shared.bpm as f64);
        let (stop_tx, stop_rx) = bounded(1);
        shared.stop_tx = Some(stop_tx);
        let epoch = shared.epoch;
        drop(shared);

        let state = Arc::clone(&self.shared);
        let output = self.output.clone();
        thread::spawn(move || tick_loop(state, output, interval, epoch, stop_rx));
        Ok(())
    }

    /// Stop ticking. Subscriber channels are closed here, exactly once;
    /// stopping a stopped metronome is a no-op.
    pub fn stop(&self) {
        let mut shared = self.shared.lock().unwrap();
        if !shared.running {
            return;
        }
        shared.running = false;
        shared.stop_tx = None;
        shared.subscribers.clear();
    }

    /// Change tempo.
    ///
    /// While running this stops and restarts the tick loop with the new
    /// interval: the beat/bar counters reset and existing subscriptions
    /// close, exactly as an explicit stop/start would. The counter reset
    /// is part of the contract.
    pub fn set_bpm(&self, bpm: u32) -> Result<(), MetronomeError> {
        validate_bpm(bpm)?;

        let was_running = {
            let mut shared = self.shared.lock().unwrap();
            let was_running = shared.running;
            if was_running {
                shared.running = false;
                shared.stop_tx = None;
                shared.subscribers.clear();
            }
            shared.bpm = bpm;
            was_running
        };

        if was_running {
            self.start()?;
        }
        Ok(())
    }

    /// Swap the active pattern; takes effect on the next tick.
    pub fn set_pattern(&self, pattern: Arc<Pattern>) {
        self.shared.lock().unwrap().pattern = pattern;
    }

    /// Subscribe to tick events.
    ///
    /// Each subscriber gets an independent bounded queue. Delivery is
    /// best-effort: events arriving while the queue is full are dropped
    /// for that subscriber only, and past events are never replayed. The
    /// channel disconnects when the metronome stops.
    pub fn subscribe(&self) -> Receiver<TickEvent> {
        let (tx, rx) = bounded(SUBSCRIBER_BUFFER);
        self.shared.lock().unwrap().subscribers.push(tx);
        rx
    }

    /// Zero the beat/bar counters without stopping
    pub fn reset(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.beat = 0;
        shared.bar = 1;
    }

    /// Snapshot of the current state
    pub fn state(&self) -> MetronomeState {
        let shared = self.shared.lock().unwrap();
        MetronomeState {
            bpm: shared.bpm,
            beats_per_bar: shared.beats_per_bar,
            running: shared.running,
            current_beat: shared.beat,
            current_bar: shared.bar,
            pattern_name: shared.pattern.name.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().unwrap().running
    }

    pub fn bpm(&self) -> u32 {
        self.shared.lock().unwrap().bpm
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) fn validate_bpm(bpm: u32) -> Result<(), MetronomeError> {
    if BPM_RANGE.contains(&bpm) {
        Ok(())
    } else {
        Err(MetronomeError::InvalidBpm(bpm))
    }
}

pub(crate) fn validate_beats_per_bar(beats_per_bar: u32) -> Result<(), MetronomeError> {
    if BEATS_PER_BAR_RANGE.contains(&beats_per_bar) {
        Ok(())
    } else {
        Err(MetronomeError::InvalidBeatsPerBar(beats_per_bar))
    }
}

/// Advance 1-based beat/bar counters by one tick, wrapping the beat at the
/// bar boundary.
pub(crate) fn advance_beat(beat: u32, bar: u32, beats_per_bar: u32) -> (u32, u32) {
    let beat = beat + 1;
    if beat > beats_per_bar {
        (1, bar + 1)
    } else {
        (beat, bar)
    }
}

/// Tick thread body. The deadline steps by a fixed interval each firing,
/// so a late tick is delayed, never skipped, and the period cannot drift.
fn tick_loop(
    shared: Arc<Mutex<Shared>>,
    output: Option<Arc<AudioOutput>>,
    interval: Duration,
    epoch: u64,
    stop_rx: Receiver<()>,
) {
    let mut next_tick = Instant::now() + interval;
    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        select! {
            recv(stop_rx) -> _ => break,
            default(timeout) => {
                if !fire_tick(&shared, output.as_deref(), epoch) {
                    break;
                }
                next_tick += interval;
            }
        }
    }
}

/// Handle one timer firing: advance counters, resolve the pattern, publish,
/// then play the click outside the lock. Returns false once this thread's
/// session is over.
fn fire_tick(shared: &Mutex<Shared>, output: Option<&AudioOutput>, epoch: u64) -> bool {
    let (sound, volume, bpm) = {
        let mut shared = shared.lock().unwrap();
        if !shared.running || shared.epoch != epoch {
            return false;
        }

        let (beat, bar) = advance_beat(shared.beat, shared.bar, shared.beats_per_bar);
        shared.beat = beat;
        shared.bar = bar;

        let (sound, volume) = shared.pattern.resolve(beat, bar);
        let event = TickEvent {
            beat,
            bar,
            sound,
            volume,
            timestamp: Instant::now(),
        };
        // Publishing under the lock means no send can race the close in
        // stop(); try_send keeps it constant-time.
        publish(&mut shared.subscribers, &event);
        (sound, volume, shared.bpm)
    };

    if let Some(output) = output {
        let sample_rate = output.sample_rate();
        let frames = synth::beat_interval_samples(bpm, sample_rate) / 10;
        let click = synth::synthesize(sound, volume, frames, sample_rate);
        if let Err(err) = output.play(click) {
            warn!("click playback failed: {}", err);
        }
    }
    true
}

/// Fan an event out without blocking: a full queue drops this event for
/// that subscriber, a disconnected receiver is unsubscribed.
fn publish(subscribers: &mut Vec<Sender<TickEvent>>, event: &TickEvent) {
    subscribers.retain(|tx| match tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(beat = event.beat, bar = event.bar, "subscriber queue full, tick dropped");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clave_core::PatternRegistry;

    fn basic() -> Arc<Pattern> {
        PatternRegistry::with_builtins().lookup("basic").unwrap()
    }

    fn event(beat: u32, bar: u32) -> TickEvent {
        TickEvent {
            beat,
            bar,
            sound: SoundKind::Normal,
            volume: 0.7,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_construction_validates_ranges() {
        assert!(Metronome::new(20, 1, basic()).is_ok());
        assert!(Metronome::new(300, 32, basic()).is_ok());

        assert_eq!(
            Metronome::new(19, 4, basic()).unwrap_err(),
            MetronomeError::InvalidBpm(19)
        );
        assert_eq!(
            Metronome::new(301, 4, basic()).unwrap_err(),
            MetronomeError::InvalidBpm(301)
        );
        assert_eq!(
            Metronome::new(120, 0, basic()).unwrap_err(),
            MetronomeError::InvalidBeatsPerBar(0)
        );
        assert_eq!(
            Metronome::new(120, 33, basic()).unwrap_err(),
            MetronomeError::InvalidBeatsPerBar(33)
        );
    }

    #[test]
    fn test_advance_beat_wraps_at_bar() {
        assert_eq!(advance_beat(0, 1, 4), (1, 1));
        assert_eq!(advance_beat(3, 1, 4), (4, 1));
        assert_eq!(advance_beat(4, 1, 4), (1, 2));
        // One-beat bars increment the bar every tick
        assert_eq!(advance_beat(1, 7, 1), (1, 8));
    }

    #[test]
    fn test_advance_beat_closed_form() {
        // After n ticks from (0, 1): beat = ((n-1) % m) + 1, bar = ((n-1) / m) + 1
        for beats_per_bar in [1, 3, 4, 7] {
            let (mut beat, mut bar) = (0, 1);
            for n in 1..=50u32 {
                let next = advance_beat(beat, bar, beats_per_bar);
                beat = next.0;
                bar = next.1;
                assert_eq!(beat, (n - 1) % beats_per_bar + 1);
                assert_eq!(bar, (n - 1) / beats_per_bar + 1);
            }
        }
    }

    #[test]
    fn test_initial_state() {
        let metronome = Metronome::new(120, 4, basic()).unwrap();
        let state = metronome.state();
        assert_eq!(state.bpm, 120);
        assert_eq!(state.beats_per_bar, 4);
        assert!(!state.running);
        assert_eq!(state.current_beat, 0);
        assert_eq!(state.current_bar, 1);
        assert_eq!(state.pattern_name, "basic");
    }

    #[test]
    fn test_start_twice_fails() {
        let metronome = Metronome::new(120, 4, basic()).unwrap();
        metronome.start().unwrap();
        assert_eq!(metronome.start().unwrap_err(), MetronomeError::AlreadyRunning);
        metronome.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let metronome = Metronome::new(120, 4, basic()).unwrap();
        metronome.stop();
        metronome.start().unwrap();
        metronome.stop();
        metronome.stop();
        assert!(!metronome.is_running());
    }

    #[test]
    fn test_set_bpm_validates() {
        let metronome = Metronome::new(120, 4, basic()).unwrap();
        assert_eq!(metronome.set_bpm(301).unwrap_err(), MetronomeError::InvalidBpm(301));
        metronome.set_bpm(90).unwrap();
        assert_eq!(metronome.bpm(), 90);
        assert!(!metronome.is_running());
    }

    #[test]
    fn test_set_pattern_swaps_for_next_tick() {
        let registry = PatternRegistry::with_builtins();
        let metronome = Metronome::new(120, 4, registry.lookup("basic").unwrap()).unwrap();
        metronome.set_pattern(registry.lookup("waltz").unwrap());
        assert_eq!(metronome.state().pattern_name, "waltz");
    }

    #[test]
    fn test_publish_drops_on_full_without_touching_others() {
        let (small_tx, small_rx) = crossbeam_channel::bounded(1);
        let (big_tx, big_rx) = crossbeam_channel::bounded(10);
        let mut subscribers = vec![small_tx, big_tx];

        for n in 1..=3 {
            publish(&mut subscribers, &event(n, 1));
        }

        // The small queue kept only the first event but stays subscribed
        assert_eq!(small_rx.try_iter().count(), 1);
        assert_eq!(big_rx.try_iter().count(), 3);
        assert_eq!(subscribers.len(), 2);
    }

    #[test]
    fn test_publish_unsubscribes_disconnected_receivers() {
        let (dead_tx, dead_rx) = crossbeam_channel::bounded::<TickEvent>(4);
        drop(dead_rx);
        let (live_tx, live_rx) = crossbeam_channel::bounded(4);
        let mut subscribers = vec![dead_tx, live_tx];

        publish(&mut subscribers, &event(1, 1));

        assert_eq!(subscribers.len(), 1);
        assert_eq!(live_rx.try_iter().count(), 1);
    }

    #[test]
    fn test_live_ticks_advance_and_close_on_stop() {
        let metronome = Metronome::new(300, 4, basic()).unwrap();
        let events = metronome.subscribe();
        metronome.start().unwrap();

        // At 300 BPM a tick lands every 200ms
        let mut received = Vec::new();
        for _ in 0..5 {
            received.push(events.recv_timeout(Duration::from_secs(2)).unwrap());
        }

        for (i, event) in received.iter().enumerate() {
            let n = i as u32 + 1;
            assert_eq!(event.beat, (n - 1) % 4 + 1);
            assert_eq!(event.bar, (n - 1) / 4 + 1);
        }
        // Beat 1 of the basic pattern is the accent
        assert_eq!(received[0].sound, SoundKind::Accent);
        assert_eq!(received[0].volume, 1.0);
        assert_eq!(received[1].sound, SoundKind::Normal);

        metronome.stop();
        assert!(!metronome.is_running());

        // Drain whatever was buffered; the channel must then disconnect
        loop {
            match events.recv_timeout(Duration::from_millis(500)) {
                Ok(_) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    panic!("subscriber channel did not close on stop");
                }
            }
        }
    }

    #[test]
    fn test_restart_resets_counters() {
        let metronome = Metronome::new(300, 2, basic()).unwrap();
        let events = metronome.subscribe();
        metronome.start().unwrap();
        let _ = events.recv_timeout(Duration::from_secs(2)).unwrap();
        metronome.stop();

        metronome.start().unwrap();
        let events = metronome.subscribe();
        let first = events.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.beat, 1);
        assert_eq!(first.bar, 1);
        metronome.stop();
    }

    #[test]
    fn test_reset_zeroes_counters_without_stopping() {
        let metronome = Metronome::new(300, 4, basic()).unwrap();
        metronome.start().unwrap();
        thread::sleep(Duration::from_millis(450));
        metronome.reset();
        let state = metronome.state();
        assert!(state.running);
        assert_eq!(state.current_beat, 0);
        assert_eq!(state.current_bar, 1);
        metronome.stop();
    }
}
