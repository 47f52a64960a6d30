//! Cache Statistics Module
//!
//! Counts what the facade saw: hits, misses, decode failures, timeouts and
//! store errors. Callers only ever see `None`; these counters keep the causes
//! apart for operators.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of the facade counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a decoded value
    pub hits: u64,
    /// Reads where the key was absent
    pub misses: u64,
    /// Reads where the stored payload failed to decode
    pub decode_failures: u64,
    /// Operations abandoned at their wait budget
    pub timeouts: u64,
    /// Operations that failed inside the store
    pub errors: u64,
    /// Operations skipped because the store was not ready
    pub skipped: u64,
    /// Writes the store accepted
    pub writes: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates hits / (hits + misses + decode failures), or 0.0 with no reads.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.decode_failures;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Metrics ==
/// Shared, lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    decode_failures: AtomicU64,
    timeouts: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
    writes: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheMetrics::new().snapshot();
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        assert_eq!(metrics.snapshot().hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_counts_decode_failures_as_misses() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_decode_failure();
        metrics.record_hit();
        assert_eq!(metrics.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_failure_counters_are_separate() {
        let metrics = CacheMetrics::new();
        metrics.record_timeout();
        metrics.record_error();
        metrics.record_error();
        metrics.record_skipped();
        metrics.record_write();

        let stats = metrics.snapshot();
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.hits + stats.misses, 0);
    }
}
