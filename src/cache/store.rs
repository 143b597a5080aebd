//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, byte-size
//! accounting and category TTL expiration.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cache::{
    current_timestamp_ms, CacheCounters, CacheEntry, CacheStats, LruTracker, CATEGORY_RESPONSES,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Remediation ==
/// Outcome of the cache-pressure remediation hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Remediation {
    /// Entries removed because their TTL had elapsed
    pub expired_removed: usize,
    /// Entries removed from the responses category to relieve pressure
    pub responses_cleared: usize,
    /// Utilization after remediation, as a percentage
    pub utilization_percent: f64,
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
///
/// Invariant: `current_size` equals the sum of `size_bytes` over live entries
/// and never exceeds `config.max_size` once `set` returns.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Running hit/miss/eviction counters
    counters: CacheCounters,
    /// Sum of live entry sizes in bytes
    current_size: usize,
    config: CacheConfig,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty CacheStore. Call `load()` to restore persisted entries.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            counters: CacheCounters::new(),
            current_size: 0,
            config,
        }
    }

    // == Get ==
    /// Retrieves a value by key, judging expiry by `category`'s TTL.
    ///
    /// Expired entries are removed and counted as misses. A hit moves the
    /// entry to the most recently used end.
    pub fn get(&mut self, key: &str, category: &str) -> Option<Value> {
        let ttl = self.config.ttl.ttl_for(category);
        let now = current_timestamp_ms();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(ttl, now),
            None => {
                self.counters.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.counters.record_miss();
            debug!(key, category, "cache entry expired on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        let data = entry.data.clone();
        self.lru.touch(key);
        self.counters.record_hit();
        Some(data)
    }

    // == Set ==
    /// Stores a value under `key`, replacing any existing entry.
    ///
    /// Least recently used entries are evicted until the new value fits.
    /// Values whose serialized size exceeds the whole cache are rejected
    /// without touching the store.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        data: Value,
        category: &str,
        metadata: Map<String, Value>,
    ) -> Result<()> {
        let key = key.into();
        let size = serde_json::to_vec(&data)?.len();

        if size > self.config.max_size {
            warn!(
                "Cache item too large: {} bytes (max {} bytes)",
                size, self.config.max_size
            );
            return Err(CacheError::ItemTooLarge {
                size,
                max: self.config.max_size,
            });
        }

        self.remove_entry(&key);
        self.make_room(size);
        self.insert_entry(CacheEntry::new(key, data, category, size, metadata));
        Ok(())
    }

    // == Evict Oldest ==
    /// Removes the least recently used entry, returning its key.
    ///
    /// No-op on an empty store.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let key = self.lru.evict_oldest()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.current_size -= entry.size_bytes;
        }
        self.counters.record_eviction();
        debug!(key = %key, "evicted least recently used entry");
        Some(key)
    }

    // == Clear ==
    /// Drops every entry and resets counters, or only the entries of `category`.
    pub fn clear(&mut self, category: Option<&str>) -> usize {
        match category {
            None => {
                let removed = self.entries.len();
                self.entries.clear();
                self.lru.clear();
                self.current_size = 0;
                self.counters.reset();
                removed
            }
            Some(category) => self.remove_where(|entry| entry.category == category),
        }
    }

    // == Remove Where ==
    /// Removes every entry matching `predicate`, returning how many were removed.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&CacheEntry) -> bool,
    {
        let keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &keys {
            self.remove_entry(key);
        }
        keys.len()
    }

    // == Cleanup ==
    /// Removes every entry whose own category TTL has elapsed.
    ///
    /// Survivors keep their recency order. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let now = current_timestamp_ms();
        let ttl = &self.config.ttl;
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(ttl.ttl_for(&entry.category), now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        expired.len()
    }

    // == Remediate ==
    /// Relieves cache pressure: sweeps expired entries, then clears the
    /// responses category if utilization is still above `threshold_percent`.
    pub fn remediate(&mut self, threshold_percent: f64) -> Remediation {
        let expired_removed = self.cleanup();
        let responses_cleared = if self.utilization_percent() > threshold_percent {
            self.clear(Some(CATEGORY_RESPONSES))
        } else {
            0
        };

        if expired_removed > 0 || responses_cleared > 0 {
            info!(
                "Cache remediation removed {} expired and {} response entries",
                expired_removed, responses_cleared
            );
        }

        Remediation {
            expired_removed,
            responses_cleared,
            utilization_percent: self.utilization_percent(),
        }
    }

    // == Stats ==
    /// Returns statistics recomputed from live entries and running counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats =
            CacheStats::from_counters(&self.counters, self.current_size, self.config.max_size);
        for entry in self.entries.values() {
            stats.record_entry(&entry.category, entry.size_bytes, entry.created_at);
        }
        stats
    }

    // == Accessors ==
    /// Returns the entry under `key` without affecting recency or counters.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Iterates live entries from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &CacheEntry> + '_ {
        self.lru
            .iter_oldest_first()
            .filter_map(move |key| self.entries.get(key))
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Sum of live entry sizes in bytes.
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.config.max_size == 0 {
            0.0
        } else {
            self.current_size as f64 * 100.0 / self.config.max_size as f64
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internal Helpers ==
    /// Evicts from the LRU end until `incoming` more bytes fit.
    pub(super) fn make_room(&mut self, incoming: usize) {
        while self.current_size + incoming > self.config.max_size {
            if self.evict_oldest().is_none() {
                break;
            }
        }
    }

    /// Inserts an entry at the most recently used end. Caller guarantees room.
    pub(super) fn insert_entry(&mut self, entry: CacheEntry) {
        self.current_size += entry.size_bytes;
        self.lru.touch(&entry.key);
        self.entries.insert(entry.key.clone(), entry);
    }

    pub(super) fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.current_size -= entry.size_bytes;
        Some(entry)
    }

    /// Drops all entries without resetting counters.
    pub(super) fn reset_entries(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.current_size = 0;
    }

    pub(super) fn counters_mut(&mut self) -> &mut CacheCounters {
        &mut self.counters
    }
}
