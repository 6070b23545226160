//! Warm-up tracking for delta-based per-process gauges.
//!
//! Per-process CPU percentages are computed from the difference between two
//! CPU time readings separated by a short interval. The first reading only
//! establishes a baseline; reading the gauge before a second pass would
//! report zeros. This coordinator makes that warm-up requirement an explicit
//! state machine: it decides when a priming pass runs and when the dependent
//! gauge may be trusted.

use std::time::{Duration, Instant};

/// How often the baseline pass is refreshed.
pub const PRIME_COOLDOWN: Duration = Duration::from_secs(5);

/// Minimum elapsed gap between a priming pass and a trustworthy read of the
/// dependent gauge.
pub const SETTLE_GAP: Duration = Duration::from_millis(200);

pub struct PrimingCoordinator {
    last_primed_at: Option<Instant>,
    cooldown: Duration,
    settle: Duration,
}

impl PrimingCoordinator {
    pub fn new(cooldown: Duration, settle: Duration) -> Self {
        Self {
            last_primed_at: None,
            cooldown,
            settle,
        }
    }

    pub fn settle_gap(&self) -> Duration {
        self.settle
    }

    /// Runs `prime` when the gauge has never been primed or the cooldown has
    /// elapsed since the last pass, recording the pass time.
    ///
    /// Returns `true` once at least the settle gap has elapsed since the
    /// most recent pass. After a fresh pass this returns `false`; callers
    /// must wait out the settle gap before reading the dependent gauge.
    pub fn ensure_primed<F: FnOnce()>(&mut self, now: Instant, prime: F) -> bool {
        let needs_priming = match self.last_primed_at {
            None => true,
            Some(at) => now.duration_since(at) > self.cooldown,
        };
        if needs_priming {
            prime();
            self.last_primed_at = Some(now);
            return false;
        }
        self.is_settled(now)
    }

    /// True once the settle gap since the last priming pass has elapsed.
    pub fn is_settled(&self, now: Instant) -> bool {
        self.last_primed_at
            .is_some_and(|at| now.duration_since(at) >= self.settle)
    }
}

impl Default for PrimingCoordinator {
    fn default() -> Self {
        Self::new(PRIME_COOLDOWN, SETTLE_GAP)
    }
}
