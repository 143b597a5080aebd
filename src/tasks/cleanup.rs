//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that runs `cleanup()` every `interval`.
///
/// The write lock is held only for the sweep itself.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(CacheStore::new(CacheConfig::default())));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<RwLock<CacheStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.cleanup()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CATEGORY_DOCS, CATEGORY_MEMORY};
    use crate::config::{CacheConfig, TtlPolicy};
    use serde_json::{json, Map};

    fn short_lived_cache() -> Arc<RwLock<CacheStore>> {
        let config = CacheConfig {
            ttl: TtlPolicy::new(Duration::from_secs(3600))
                .with_category(CATEGORY_MEMORY, Duration::from_millis(200)),
            ..CacheConfig::with_max_size(10_000)
        };
        Arc::new(RwLock::new(CacheStore::new(config)))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = short_lived_cache();
        {
            let mut cache_guard = cache.write().await;
            cache_guard
                .set("expire_soon", json!("value"), CATEGORY_MEMORY, Map::new())
                .unwrap();
            cache_guard
                .set("long_lived", json!("value"), CATEGORY_DOCS, Map::new())
                .unwrap();
        }

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(300));
        tokio::time::sleep(Duration::from_millis(800)).await;

        {
            let cache_guard = cache.read().await;
            assert!(
                cache_guard.peek("expire_soon").is_none(),
                "Expired entry should have been cleaned up"
            );
            assert!(cache_guard.peek("long_lived").is_some());
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(short_lived_cache(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
