use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for one cache
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    build_failures: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// One field group rebuilt and committed
    pub(crate) fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.build_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// `now` comes from the owning cache's clock
    pub fn snapshot(&self, entries: usize, now: DateTime<Utc>) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            taken_at: now,
        }
    }
}

/// Point-in-time view of [`CacheStats`]
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
    pub build_failures: u64,
    pub evictions: u64,
    pub taken_at: DateTime<Utc>,
}

impl CacheStatsSnapshot {
    /// Hit rate in 0.0..=1.0; 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_counters_accumulate() {
        let stats = CacheStats::new();
        stats.record_miss();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_refresh();
        stats.record_failure();
        stats.record_evictions(4);

        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let snapshot = stats.snapshot(7, now);
        assert_eq!(snapshot.entries, 7);
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.refreshes, 1);
        assert_eq!(snapshot.build_failures, 1);
        assert_eq!(snapshot.evictions, 4);
        assert_eq!(snapshot.hit_rate(), 0.75);
        assert_eq!(snapshot.taken_at, now);
    }

    #[test]
    fn test_hit_rate_without_lookups() {
        let snapshot = CacheStats::new().snapshot(0, Utc::now());
        assert_eq!(snapshot.hit_rate(), 0.0);
    }
}
