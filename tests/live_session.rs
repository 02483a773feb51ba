//! A full live session against the public API: registry lookup, scheduler
//! lifecycle, subscription, pattern swap, tap estimation.

use std::time::{Duration, Instant};

use anyhow::Result;

use clave::{Metronome, PatternRegistry, SoundKind, TapTempo};

#[test]
fn session_ticks_swaps_patterns_and_closes() -> Result<()> {
    let registry = PatternRegistry::with_builtins();
    let metronome = Metronome::new(300, 3, registry.lookup("waltz")?)?;

    let events = metronome.subscribe();
    metronome.start()?;

    // First bar of the waltz: accent then two normals
    let first = events.recv_timeout(Duration::from_secs(2))?;
    assert_eq!((first.beat, first.bar), (1, 1));
    assert_eq!(first.sound, SoundKind::Accent);

    let second = events.recv_timeout(Duration::from_secs(2))?;
    assert_eq!(second.sound, SoundKind::Normal);

    // Swap the pattern mid-flight; some later tick resolves as ride
    metronome.set_pattern(registry.lookup("jazz")?);
    let mut saw_ride = false;
    for _ in 0..4 {
        let event = events.recv_timeout(Duration::from_secs(2))?;
        if event.sound == SoundKind::Ride {
            saw_ride = true;
            break;
        }
    }
    assert!(saw_ride, "pattern swap never took effect");

    let state = metronome.state();
    assert!(state.running);
    assert_eq!(state.pattern_name, "jazz");

    metronome.stop();
    assert!(!metronome.is_running());

    // Stopping closes the subscription once the buffer drains
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match events.try_recv() {
            Ok(_) => continue,
            Err(crossbeam_channel::TryRecvError::Disconnected) => break,
            Err(crossbeam_channel::TryRecvError::Empty) => {
                assert!(Instant::now() < deadline, "channel never disconnected");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
    Ok(())
}

#[test]
fn tap_session_matches_scheduler_tempo() {
    let mut tap = TapTempo::new();
    let base = Instant::now();

    // Tapping along at 100 BPM (600ms apart)
    for i in 0..4 {
        tap.register_tap(base + Duration::from_millis(600 * i));
    }

    let estimate = tap.estimate().expect("enough taps for an estimate");
    assert_eq!(estimate.bpm, 100);
    assert!(estimate.stability > 99.0);
}
