//! Auto-Persist Task
//!
//! Background task that periodically writes the cache to its durable sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Spawns a background task that persists the cache every `interval`.
///
/// The entry set is captured under a read lock and written after the lock
/// is released, so readers and writers are not blocked on file I/O.
pub fn spawn_persist_task(cache: Arc<RwLock<CacheStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache persistence task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let (persisted, path) = {
                let cache_guard = cache.read().await;
                (
                    cache_guard.to_persisted(),
                    cache_guard.config().persist_path.clone(),
                )
            };

            match persisted.write_to(&path).await {
                Ok(()) => debug!(
                    "Persisted {} cache entries to {}",
                    persisted.entries.len(),
                    path.display()
                ),
                Err(e) => warn!("Cache persistence failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{PersistedCache, CATEGORY_RESPONSES};
    use crate::config::CacheConfig;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persist_task_writes_sink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let cache = Arc::new(RwLock::new(CacheStore::new(CacheConfig {
            persist_path: path.clone(),
            ..CacheConfig::with_max_size(10_000)
        })));
        cache
            .write()
            .await
            .set("k", json!({"answer": 42}), CATEGORY_RESPONSES, Map::new())
            .unwrap();

        let handle = spawn_persist_task(cache, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.abort();

        let persisted = PersistedCache::read_from(&path).await.unwrap();
        assert_eq!(persisted.entries.len(), 1);
        assert_eq!(persisted.entries[0].0, "k");
    }
}
