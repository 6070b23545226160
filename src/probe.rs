//! TTL cache around expensive or privileged probes.

use std::time::{Duration, Instant};

/// Caches the result of a probe that is slow (subprocess spawn), privileged
/// (may fail without elevated rights), or platform-conditional (absent
/// hardware).
///
/// A failed or empty probe result is cached as `None` just like a success,
/// so a broken probe is retried at most once per TTL window instead of on
/// every tick.
pub struct ProbeCache<T> {
    value: Option<T>,
    fetched_at: Option<Instant>,
    ttl: Duration,
}

impl<T: Clone> ProbeCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            value: None,
            fetched_at: None,
            ttl,
        }
    }

    /// Returns the cached value while the last fetch is younger than the
    /// TTL. Otherwise invokes `probe` exactly once and replaces the cached
    /// record with whatever it returns, success or not.
    pub fn get_or_refresh<F>(&mut self, now: Instant, probe: F) -> Option<T>
    where
        F: FnOnce() -> Option<T>,
    {
        if let Some(fetched_at) = self.fetched_at {
            if now.duration_since(fetched_at) < self.ttl {
                return self.value.clone();
            }
        }
        self.value = probe();
        self.fetched_at = Some(now);
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_runs_once_within_ttl() {
        let mut cache = ProbeCache::new(Duration::from_secs(5));
        let mut calls = 0;
        let t0 = Instant::now();

        for offset in [0, 1, 2, 3, 4] {
            let value = cache.get_or_refresh(t0 + Duration::from_secs(offset), || {
                calls += 1;
                Some(45.0)
            });
            assert_eq!(value, Some(45.0));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn probe_reruns_after_ttl_expiry() {
        let mut cache = ProbeCache::new(Duration::from_secs(5));
        let mut calls = 0;
        let t0 = Instant::now();

        cache.get_or_refresh(t0, || {
            calls += 1;
            Some(45.0)
        });
        let value = cache.get_or_refresh(t0 + Duration::from_secs(6), || {
            calls += 1;
            Some(47.5)
        });
        assert_eq!(calls, 2);
        assert_eq!(value, Some(47.5));
    }

    #[test]
    fn failure_is_cached_and_not_retried_before_ttl() {
        let mut cache: ProbeCache<f64> = ProbeCache::new(Duration::from_secs(5));
        let mut calls = 0;
        let t0 = Instant::now();

        assert_eq!(
            cache.get_or_refresh(t0, || {
                calls += 1;
                None
            }),
            None
        );
        // Within the TTL the cached failure is returned without invoking
        // the probe again.
        assert_eq!(
            cache.get_or_refresh(t0 + Duration::from_secs(2), || {
                calls += 1;
                Some(45.0)
            }),
            None
        );
        assert_eq!(calls, 1);

        // After expiry the probe gets another chance.
        assert_eq!(
            cache.get_or_refresh(t0 + Duration::from_secs(6), || {
                calls += 1;
                Some(45.0)
            }),
            Some(45.0)
        );
        assert_eq!(calls, 2);
    }
}
