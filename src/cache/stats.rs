//! Cache Statistics Module
//!
//! Running hit/miss/eviction counters plus the derived statistics view.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Counters ==
/// Running counters kept by the store between stats snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheCounters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
}

impl CacheCounters {
    // == Constructor ==
    /// Creates counters with all values at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Stats ==
/// Read-only aggregate recomputed from live entries on every call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of live entries
    pub total_items: usize,
    /// Sum of live entry sizes in bytes
    pub total_size: usize,
    /// Configured capacity in bytes
    pub max_size: usize,
    /// total_size / max_size, as a percentage
    pub utilization_percent: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// hits / (hits + misses), 0.0 before any access
    pub hit_rate: f64,
    /// Entry count per category
    pub category_counts: BTreeMap<String, usize>,
    /// Byte total per category
    pub category_sizes: BTreeMap<String, usize>,
    /// Creation time of the oldest live entry
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Creation time of the newest live entry
    pub newest_entry: Option<DateTime<Utc>>,
}

impl CacheStats {
    /// Starts a stats view from the running counters and capacity figures.
    pub fn from_counters(counters: &CacheCounters, total_size: usize, max_size: usize) -> Self {
        let utilization_percent = if max_size == 0 {
            0.0
        } else {
            total_size as f64 * 100.0 / max_size as f64
        };

        Self {
            total_size,
            max_size,
            utilization_percent,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            hit_rate: counters.hit_rate(),
            ..Self::default()
        }
    }

    /// Folds one live entry into the per-category breakdown and age bounds.
    pub fn record_entry(&mut self, category: &str, size: usize, created_at_ms: u64) {
        self.total_items += 1;
        *self.category_counts.entry(category.to_string()).or_default() += 1;
        *self.category_sizes.entry(category.to_string()).or_default() += size;

        let created = DateTime::<Utc>::from_timestamp_millis(created_at_ms as i64);
        if created.is_some() {
            if self.oldest_entry.is_none() || created < self.oldest_entry {
                self.oldest_entry = created;
            }
            if created > self.newest_entry {
                self.newest_entry = created;
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = CacheCounters::new();
        assert_eq!(counters.hits, 0);
        assert_eq!(counters.misses, 0);
        assert_eq!(counters.evictions, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let counters = CacheCounters::new();
        assert_eq!(counters.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut counters = CacheCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.hit_rate(), 0.75);
    }

    #[test]
    fn test_counters_reset() {
        let mut counters = CacheCounters::new();
        counters.record_hit();
        counters.record_eviction();
        counters.reset();
        assert_eq!(counters, CacheCounters::new());
    }

    #[test]
    fn test_stats_utilization() {
        let counters = CacheCounters::new();
        let stats = CacheStats::from_counters(&counters, 25, 200);
        assert_eq!(stats.utilization_percent, 12.5);
    }

    #[test]
    fn test_stats_zero_capacity() {
        let stats = CacheStats::from_counters(&CacheCounters::new(), 0, 0);
        assert_eq!(stats.utilization_percent, 0.0);
    }

    #[test]
    fn test_record_entry_breakdown_and_bounds() {
        let mut stats = CacheStats::from_counters(&CacheCounters::new(), 30, 100);
        stats.record_entry("docs", 10, 2_000);
        stats.record_entry("docs", 5, 1_000);
        stats.record_entry("responses", 15, 3_000);

        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.category_counts["docs"], 2);
        assert_eq!(stats.category_sizes["docs"], 15);
        assert_eq!(
            stats.oldest_entry.map(|t| t.timestamp_millis()),
            Some(1_000)
        );
        assert_eq!(
            stats.newest_entry.map(|t| t.timestamp_millis()),
            Some(3_000)
        );
    }
}
