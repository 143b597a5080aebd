//! Task Runner
//!
//! Runs named units of work for agents: answers from the response cache when
//! possible, otherwise executes through the recovery engine and caches the
//! operation's own result.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::error::RecoveryError;
use crate::recovery::{RecoveryContext, RecoveryEngine};

/// Cache footprint of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCacheStats {
    pub agent: String,
    pub total_items: usize,
    /// Bytes held by the agent's entries
    pub total_size: usize,
    /// Store-wide hit rate
    pub hit_rate: f64,
}

/// Composes the cache and the recovery engine for agent tasks.
#[derive(Clone)]
pub struct TaskRunner {
    cache: Arc<RwLock<CacheStore>>,
    engine: Arc<RecoveryEngine>,
}

impl TaskRunner {
    pub fn new(cache: Arc<RwLock<CacheStore>>, engine: Arc<RecoveryEngine>) -> Self {
        Self { cache, engine }
    }

    /// Returns the cached response for `(agent, task)`, or runs `operation`
    /// with recovery.
    ///
    /// Only values produced by the operation itself are cached; strategy
    /// defaults (e.g. from `skip`) are returned but not stored.
    pub async fn execute_task<F, Fut>(
        &self,
        agent: &str,
        task: &str,
        mut operation: F,
        context: RecoveryContext,
    ) -> Result<Value, RecoveryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        let cached = self.cache.write().await.get_agent_response(agent, task);
        match cached {
            Ok(Some(response)) => {
                debug!("Cache hit for {} task '{}'", agent, task);
                return Ok(response);
            }
            Ok(None) => {}
            Err(e) => warn!("Response cache lookup failed for {}: {}", agent, e),
        }

        let cache = &self.cache;
        let context = context.with_data("agent", agent).with_data("task", task);

        self.engine
            .execute_with_recovery(
                move || {
                    let attempt = operation();
                    async move {
                        let response = attempt.await?;
                        let stored = cache
                            .write()
                            .await
                            .cache_agent_response(agent, task, response.clone());
                        if let Err(e) = stored {
                            warn!("Response from {} not cached: {}", agent, e);
                        }
                        Ok::<_, anyhow::Error>(response)
                    }
                },
                context,
            )
            .await
    }

    /// Removes every cached entry tagged with `agent`.
    pub async fn clear_agent_cache(&self, agent: &str) -> usize {
        let removed = self
            .cache
            .write()
            .await
            .remove_where(|entry| belongs_to(entry, agent));
        debug!("Cleared {} cache entries for {}", removed, agent);
        removed
    }

    pub async fn agent_cache_stats(&self, agent: &str) -> AgentCacheStats {
        let cache = self.cache.read().await;
        let (total_items, total_size) = cache
            .iter_oldest_first()
            .filter(|entry| belongs_to(entry, agent))
            .fold((0, 0), |(count, size), entry| (count + 1, size + entry.size_bytes));

        AgentCacheStats {
            agent: agent.to_string(),
            total_items,
            total_size,
            hit_rate: cache.counters().hit_rate(),
        }
    }
}

fn belongs_to(entry: &CacheEntry, agent: &str) -> bool {
    entry.metadata.get("agent").and_then(Value::as_str) == Some(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, RecoveryConfig};
    use crate::recovery::{ErrorPattern, Strategy};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    async fn runner_in(dir: &TempDir) -> TaskRunner {
        let cache = Arc::new(RwLock::new(CacheStore::new(CacheConfig::with_max_size(10_000))));
        let engine = RecoveryEngine::new(RecoveryConfig::in_dir(dir.path())).await;
        TaskRunner::new(cache, Arc::new(engine))
    }

    #[tokio::test]
    async fn test_second_execution_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir).await;
        let calls = &AtomicU32::new(0);

        for _ in 0..2 {
            let response = runner
                .execute_task(
                    "backend-developer",
                    "Create REST API endpoint",
                    move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(json!({"endpoint": "/users"}))
                    },
                    RecoveryContext::new(),
                )
                .await
                .unwrap();
            assert_eq!(response, json!({"endpoint": "/users"}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = runner.agent_cache_stats("backend-developer").await;
        assert_eq!(stats.total_items, 1);
        assert!(stats.total_size > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_default_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir).await;
        runner
            .engine
            .add_error_pattern(ErrorPattern::new(
                "registry unavailable",
                Strategy::Skip {
                    default_value: json!("fallback"),
                },
            ))
            .await
            .unwrap();

        let response = runner
            .execute_task(
                "frontend-developer",
                "install deps",
                || async { Err(anyhow::anyhow!("registry unavailable")) },
                RecoveryContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(response, json!("fallback"));
        assert_eq!(runner.agent_cache_stats("frontend-developer").await.total_items, 0);
    }

    #[tokio::test]
    async fn test_clear_agent_cache_only_touches_that_agent() {
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir).await;
        {
            let mut cache = runner.cache.write().await;
            cache.cache_agent_response("planner", "a", json!(1)).unwrap();
            cache.cache_agent_response("planner", "b", json!(2)).unwrap();
            cache.cache_agent_response("tester", "a", json!(3)).unwrap();
        }

        assert_eq!(runner.clear_agent_cache("planner").await, 2);
        assert_eq!(runner.agent_cache_stats("planner").await.total_items, 0);
        assert_eq!(runner.agent_cache_stats("tester").await.total_items, 1);
    }
}
