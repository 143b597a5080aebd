//! Cache Module
//!
//! Provides a byte-bounded cache with per-category TTL expiration, LRU
//! eviction and optional durable persistence.

mod entry;
mod key;
mod lru;
mod persist;
mod stats;
mod store;
mod warmup;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use key::generate_key;
pub use lru::LruTracker;
pub use persist::{PersistedCache, PersistedCounters};
pub use stats::{CacheCounters, CacheStats};
pub use store::{CacheStore, Remediation};
pub use warmup::{load_warmup_items, WarmupItem};

// == Categories ==
/// Agent responses; the most volatile category
pub const CATEGORY_RESPONSES: &str = "responses";
/// Library documentation
pub const CATEGORY_DOCS: &str = "docs";
/// Frequently used task patterns
pub const CATEGORY_PATTERNS: &str = "patterns";
/// Short-lived working memory
pub const CATEGORY_MEMORY: &str = "memory";

/// Utilization above which remediation clears the responses category
pub const DEFAULT_REMEDIATION_THRESHOLD: f64 = 80.0;
