//! Rate computation for monotonic counter families.
//!
//! The kernel exposes cumulative counters (bytes transferred, I/O operations,
//! CPU ticks) that only grow within one boot. This module keeps the previous
//! reading per counter family and turns fresh absolute values into
//! per-second rates.

use ahash::AHashMap as HashMap;
use std::time::Instant;

/// Minimum rate window in seconds. Guards the division when two samples
/// arrive back-to-back with (near) identical timestamps.
pub const MIN_WINDOW_SECS: f64 = 1e-6;

/// Identifies one independently tracked monotonic counter.
///
/// Per-core CPU families carry the core index so each core keeps its own
/// baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterFamily {
    CpuBusyTicks,
    CpuTotalTicks,
    CoreBusyTicks(u16),
    CoreTotalTicks(u16),
    NetBytesSent,
    NetBytesRecv,
    DiskBytesRead,
    DiskBytesWritten,
    DiskReadsCompleted,
    DiskWritesCompleted,
}

/// One absolute reading of a monotonic counter.
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub value: u64,
    pub taken_at: Instant,
}

impl CounterSnapshot {
    pub fn new(value: u64, taken_at: Instant) -> Self {
        Self { value, taken_at }
    }
}

/// A derived per-second rate over the window between two consecutive
/// snapshots of the same family. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub rate: f64,
    pub window_seconds: f64,
}

impl RateSample {
    fn zero() -> Self {
        Self {
            rate: 0.0,
            window_seconds: MIN_WINDOW_SECS,
        }
    }
}

/// Holds the previous snapshot per counter family and computes rates
/// relative to the immediately preceding call.
#[derive(Default)]
pub struct RateTracker {
    previous: HashMap<CounterFamily, CounterSnapshot>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the per-second rate for `family` and advances its stored
    /// baseline to `snapshot`.
    ///
    /// The first observation of a family has no defined rate and yields 0.
    /// A regressed counter (source restarted, counter wrapped) clamps the
    /// delta to 0 for this one computation; the baseline still advances to
    /// the regressed value.
    pub fn compute_rate(&mut self, family: CounterFamily, snapshot: CounterSnapshot) -> RateSample {
        let sample = match self.previous.get(&family) {
            None => RateSample::zero(),
            Some(prev) => {
                let delta = snapshot.value.saturating_sub(prev.value);
                let window = snapshot
                    .taken_at
                    .duration_since(prev.taken_at)
                    .as_secs_f64()
                    .max(MIN_WINDOW_SECS);
                RateSample {
                    rate: delta as f64 / window,
                    window_seconds: window,
                }
            }
        };
        self.previous.insert(family, snapshot);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_observation_has_zero_rate() {
        let mut tracker = RateTracker::new();
        let sample = tracker.compute_rate(
            CounterFamily::NetBytesSent,
            CounterSnapshot::new(1000, Instant::now()),
        );
        assert_eq!(sample.rate, 0.0);
    }

    #[test]
    fn rate_is_delta_over_window() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.compute_rate(CounterFamily::NetBytesSent, CounterSnapshot::new(1000, t0));
        let sample = tracker.compute_rate(
            CounterFamily::NetBytesSent,
            CounterSnapshot::new(2000, t0 + Duration::from_secs(1)),
        );
        assert!((sample.rate - 1000.0).abs() < 1e-9);
        assert!((sample.window_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn counter_reset_clamps_to_zero_and_advances_baseline() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.compute_rate(CounterFamily::NetBytesSent, CounterSnapshot::new(1000, t0));
        tracker.compute_rate(
            CounterFamily::NetBytesSent,
            CounterSnapshot::new(2000, t0 + Duration::from_secs(1)),
        );

        // Reset: value dropped to 1500. Rate must clamp to 0.
        let sample = tracker.compute_rate(
            CounterFamily::NetBytesSent,
            CounterSnapshot::new(1500, t0 + Duration::from_secs(2)),
        );
        assert_eq!(sample.rate, 0.0);

        // The baseline is now the regressed value, not the pre-reset one.
        let sample = tracker.compute_rate(
            CounterFamily::NetBytesSent,
            CounterSnapshot::new(2500, t0 + Duration::from_secs(3)),
        );
        assert!((sample.rate - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn identical_timestamps_do_not_divide_by_zero() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.compute_rate(CounterFamily::DiskBytesRead, CounterSnapshot::new(0, t0));
        let sample =
            tracker.compute_rate(CounterFamily::DiskBytesRead, CounterSnapshot::new(100, t0));
        assert!(sample.rate.is_finite());
        assert!(sample.window_seconds >= MIN_WINDOW_SECS);
    }

    #[test]
    fn families_are_independent() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.compute_rate(CounterFamily::NetBytesSent, CounterSnapshot::new(1000, t0));
        let sample = tracker.compute_rate(
            CounterFamily::NetBytesRecv,
            CounterSnapshot::new(5000, t0 + Duration::from_secs(1)),
        );
        // First observation for the receive family, regardless of the send
        // family's state.
        assert_eq!(sample.rate, 0.0);
    }

    #[test]
    fn unchanged_counter_yields_zero_rate() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.compute_rate(CounterFamily::DiskBytesWritten, CounterSnapshot::new(42, t0));
        let sample = tracker.compute_rate(
            CounterFamily::DiskBytesWritten,
            CounterSnapshot::new(42, t0 + Duration::from_secs(1)),
        );
        assert_eq!(sample.rate, 0.0);
    }
}
