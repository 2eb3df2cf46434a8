//! Counters for cache behavior and economy cycles.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss/eviction counters shared by both caches.
///
/// Counters are relaxed atomics: they are monitoring data, not
/// synchronization.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Hit rate in percent, 0 when nothing was recorded yet.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total * 100.0
        }
    }
}

/// Summary of one economy cycle, for logging and the sim driver.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    pub territories_processed: usize,
    pub taxes_collected: f64,
    pub salaries_paid: f64,
    pub upkeep_paid: f64,
    /// Territories that could not afford upkeep this cycle.
    pub shortfalls: usize,
    /// Chunks released by the shortfall policy.
    pub chunks_released: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 75.0);
        stats.record_evictions(5);
        assert_eq!(stats.evictions(), 5);
    }
}
