//! Cache Persistence Module
//!
//! Serializes the full entry set plus hit/miss counters to a JSON sink and
//! restores it on startup, discarding entries whose category TTL has elapsed.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStore};
use crate::error::{CacheError, Result};

// == Persisted Records ==
/// Counters written alongside the entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCounters {
    pub hits: u64,
    pub misses: u64,
    pub current_size: usize,
}

/// On-disk shape of the cache: `{entries: [[key, entry], ...], stats, timestamp}`.
///
/// Entries are written least recently used first so that reloading them in
/// order reproduces the recency list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedCache {
    pub entries: Vec<(String, CacheEntry)>,
    pub stats: PersistedCounters,
    /// Unix milliseconds at which the record was taken
    pub timestamp: u64,
}

impl PersistedCache {
    /// Writes the record as pretty JSON, creating parent directories.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(path, source))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|source| io_error(path, source))
    }

    /// Reads a record previously written by `write_to`.
    pub async fn read_from(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| io_error(path, source))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl CacheStore {
    // == Snapshot For Persistence ==
    /// Captures the entries and counters in recency order.
    pub fn to_persisted(&self) -> PersistedCache {
        PersistedCache {
            entries: self
                .iter_oldest_first()
                .map(|entry| (entry.key.clone(), entry.clone()))
                .collect(),
            stats: PersistedCounters {
                hits: self.counters().hits,
                misses: self.counters().misses,
                current_size: self.current_size(),
            },
            timestamp: current_timestamp_ms(),
        }
    }

    // == Persist ==
    /// Writes the store to its configured sink. Last writer wins.
    pub async fn persist(&self) -> Result<usize> {
        let persisted = self.to_persisted();
        persisted.write_to(&self.config().persist_path).await?;
        debug!(
            "Persisted {} cache entries to {}",
            persisted.entries.len(),
            self.config().persist_path.display()
        );
        Ok(persisted.entries.len())
    }

    // == Load ==
    /// Replaces the store's contents with the configured sink's.
    ///
    /// A missing or corrupt sink is not fatal: the store is left empty and
    /// 0 is returned.
    pub async fn load(&mut self) -> usize {
        let path = self.config().persist_path.clone();

        match PersistedCache::read_from(&path).await {
            Ok(persisted) => {
                let restored = self.restore(persisted);
                info!("Loaded {} items from persistent cache", restored);
                restored
            }
            Err(CacheError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("No persistent cache at {}; starting empty", path.display());
                0
            }
            Err(e) => {
                warn!("Ignoring unreadable persistent cache: {}", e);
                0
            }
        }
    }

    // == Restore ==
    /// Rebuilds the store from a persisted record.
    ///
    /// Entries already past their category TTL are dropped. Sizes are
    /// recomputed from the data and the byte bound is enforced, so a record
    /// written under a larger `max_size` is trimmed from its LRU end.
    pub fn restore(&mut self, persisted: PersistedCache) -> usize {
        self.reset_entries();
        let now = current_timestamp_ms();
        let max_size = self.config().max_size;
        let mut restored = 0;

        for (key, mut entry) in persisted.entries {
            let ttl = self.config().ttl.ttl_for(&entry.category);
            if entry.is_expired_at(ttl, now) {
                continue;
            }

            let size = match serde_json::to_vec(&entry.data) {
                Ok(bytes) => bytes.len(),
                Err(_) => continue,
            };
            if size > max_size {
                continue;
            }

            // A repeated key replaces the earlier record
            if self.remove_entry(&key).is_some() {
                restored -= 1;
            }
            entry.key = key;
            entry.size_bytes = size;
            self.make_room(size);
            self.insert_entry(entry);
            restored += 1;
        }

        let counters = self.counters_mut();
        counters.hits = persisted.stats.hits;
        counters.misses = persisted.stats.misses;
        restored
    }
}
