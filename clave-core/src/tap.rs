//! Tap-tempo estimation
//!
//! Turns a burst of manually triggered taps into a BPM estimate plus a
//! stability score. Timestamps are passed in by the caller, so the
//! estimator stays pure and easy to test.

use std::time::{Duration, Instant};

/// Maximum number of taps retained; older ones fall off the front
pub const MAX_TAPS: usize = 8;
/// Taps older than this are discarded when a new tap arrives
pub const TAP_TIMEOUT: Duration = Duration::from_secs(2);
/// Minimum taps needed before an estimate exists
pub const MIN_TAPS: usize = 2;

/// Result of a tap-tempo estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapEstimate {
    pub bpm: u32,
    /// 100 means perfectly even taps. Erratic input can push this negative;
    /// display layers should clamp it at 0.
    pub stability: f32,
}

/// Accumulates tap timestamps and derives a tempo from them
#[derive(Debug, Default)]
pub struct TapTempo {
    taps: Vec<Instant>,
}

impl TapTempo {
    pub fn new() -> Self {
        TapTempo::default()
    }

    /// Record a tap at `now`, discarding stale history first.
    ///
    /// `now` values must be non-decreasing across calls.
    pub fn register_tap(&mut self, now: Instant) {
        if let Some(cutoff) = now.checked_sub(TAP_TIMEOUT) {
            self.taps.retain(|tap| *tap > cutoff);
        }
        self.taps.push(now);

        if self.taps.len() > MAX_TAPS {
            let excess = self.taps.len() - MAX_TAPS;
            self.taps.drain(..excess);
        }
    }

    /// BPM and stability over the retained taps.
    ///
    /// Returns `None` until at least [`MIN_TAPS`] taps have been recorded.
    /// The BPM is `60 / mean inter-tap interval`, rounded; stability is
    /// `100 * (1 - stddev / mean)` over the same intervals.
    pub fn estimate(&self) -> Option<TapEstimate> {
        if self.taps.len() < MIN_TAPS {
            return None;
        }

        let intervals: Vec<f64> = self
            .taps
            .windows(2)
            .map(|pair| pair[1].saturating_duration_since(pair[0]).as_secs_f64())
            .collect();

        let avg = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if avg <= 0.0 {
            return None;
        }

        let bpm = (60.0 / avg).round() as u32;

        let variance = intervals
            .iter()
            .map(|interval| (interval - avg).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        let stability = (100.0 * (1.0 - variance.sqrt() / avg)) as f32;

        Some(TapEstimate { bpm, stability })
    }

    /// Forget all taps
    pub fn clear(&mut self) {
        self.taps.clear();
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}
