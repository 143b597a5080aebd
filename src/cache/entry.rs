//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with category-based TTL.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Cache Entry ==
/// Represents a single cache entry with value and bookkeeping metadata.
///
/// Entries do not carry their own TTL: expiry is judged against the TTL of
/// the category they are read under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub data: Value,
    /// Category used for TTL lookup and stats
    pub category: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Serialized size of `data` in bytes
    pub size_bytes: usize,
    /// Number of successful reads
    pub access_count: u64,
    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(
        key: impl Into<String>,
        data: Value,
        category: impl Into<String>,
        size_bytes: usize,
        metadata: Map<String, Value>,
    ) -> Self {
        let now = current_timestamp_ms();

        Self {
            key: key.into(),
            data,
            category: category.into(),
            created_at: now,
            last_accessed_at: now,
            size_bytes,
            access_count: 0,
            metadata,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since creation at time `now`.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    // == Is Expired ==
    /// Checks whether the entry is older than `ttl` at time `now`.
    ///
    /// An entry whose age equals the TTL exactly is still live.
    pub fn is_expired_at(&self, ttl: Duration, now: u64) -> bool {
        u128::from(self.age_ms(now)) > ttl.as_millis()
    }

    // == Time To Live ==
    /// Remaining lifetime in milliseconds under `ttl`, saturating at zero.
    pub fn ttl_remaining_ms(&self, ttl: Duration, now: u64) -> u64 {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        ttl_ms.saturating_sub(self.age_ms(now))
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_accessed_at = now;
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CacheEntry {
        CacheEntry::new("k", json!("v"), "responses", 3, Map::new())
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry();

        assert_eq!(entry.key, "k");
        assert_eq!(entry.data, json!("v"));
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.created_at, entry.last_accessed_at);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let mut entry = entry();
        entry.created_at = 1_000;
        let ttl = Duration::from_millis(500);

        assert!(!entry.is_expired_at(ttl, 1_500), "age == ttl is still live");
        assert!(entry.is_expired_at(ttl, 1_501));
    }

    #[test]
    fn test_clock_skew_does_not_expire() {
        let mut entry = entry();
        entry.created_at = 10_000;

        // now earlier than creation, e.g. after loading from another host
        assert!(!entry.is_expired_at(Duration::from_millis(1), 5_000));
        assert_eq!(entry.age_ms(5_000), 0);
    }

    #[test]
    fn test_ttl_remaining() {
        let mut entry = entry();
        entry.created_at = 1_000;
        let ttl = Duration::from_secs(10);

        assert_eq!(entry.ttl_remaining_ms(ttl, 4_000), 7_000);
        assert_eq!(entry.ttl_remaining_ms(ttl, 20_000), 0);
    }

    #[test]
    fn test_touch_updates_access() {
        let mut entry = entry();
        entry.touch(entry.created_at + 42);
        entry.touch(entry.created_at + 50);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_accessed_at, entry.created_at + 50);
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let json = serde_json::to_value(entry()).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("sizeBytes").is_some());
        assert!(json.get("accessCount").is_some());
    }
}
