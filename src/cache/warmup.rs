//! Cache Warmup Module
//!
//! Domain-specific `set`/`get` wrappers (patterns, library docs, agent
//! responses) and the warmup composition built on them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::cache::{generate_key, CacheStore, CATEGORY_DOCS, CATEGORY_PATTERNS, CATEGORY_RESPONSES};
use crate::error::{CacheError, Result};

const NAMESPACE_PATTERN: &str = "pattern";
const NAMESPACE_DOCS: &str = "docs";
const NAMESPACE_AGENT_RESPONSE: &str = "agent-response";

// == Warmup Item ==
/// One cache-priming record, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WarmupItem {
    /// A frequently used task pattern and the agents that handle it
    Pattern {
        pattern: Value,
        #[serde(default)]
        agents: Vec<String>,
        #[serde(default)]
        complexity: Value,
        #[serde(default, rename = "successRate")]
        success_rate: Option<f64>,
    },
    /// Documentation for one library version
    Doc {
        library: String,
        version: String,
        documentation: Value,
    },
}

/// Reads a JSON array of warmup items.
pub async fn load_warmup_items(path: &Path) -> Result<Vec<WarmupItem>> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl CacheStore {
    // == Patterns ==
    /// Caches a task pattern under the `patterns` category.
    pub fn cache_pattern(
        &mut self,
        pattern: &Value,
        agents: &[String],
        complexity: &Value,
        success_rate: Option<f64>,
    ) -> Result<()> {
        let key = generate_key(pattern, NAMESPACE_PATTERN)?;
        let record = json!({
            "pattern": pattern,
            "agents": agents,
            "complexity": complexity,
            "successRate": success_rate,
            "cached": true,
        });
        self.set(key, record, CATEGORY_PATTERNS, Map::new())
    }

    /// Looks up a cached task pattern record.
    pub fn get_pattern(&mut self, pattern: &Value) -> Result<Option<Value>> {
        let key = generate_key(pattern, NAMESPACE_PATTERN)?;
        Ok(self.get(&key, CATEGORY_PATTERNS))
    }

    // == Library Docs ==
    /// Caches documentation for `library@version` under the `docs` category.
    pub fn cache_library_doc(
        &mut self,
        library: &str,
        version: &str,
        documentation: Value,
    ) -> Result<()> {
        let key = generate_key(&json!({"library": library, "version": version}), NAMESPACE_DOCS)?;
        self.set(
            key,
            documentation,
            CATEGORY_DOCS,
            metadata([("library", library), ("version", version)]),
        )
    }

    pub fn get_library_doc(&mut self, library: &str, version: &str) -> Result<Option<Value>> {
        let key = generate_key(&json!({"library": library, "version": version}), NAMESPACE_DOCS)?;
        Ok(self.get(&key, CATEGORY_DOCS))
    }

    // == Agent Responses ==
    /// Caches an agent's response to a task under the `responses` category.
    ///
    /// The entry carries `{agent, task}` metadata so it can be cleared per agent.
    pub fn cache_agent_response(&mut self, agent: &str, task: &str, response: Value) -> Result<()> {
        let key = agent_response_key(agent, task)?;
        self.set(
            key,
            response,
            CATEGORY_RESPONSES,
            metadata([("agent", agent), ("task", task)]),
        )
    }

    pub fn get_agent_response(&mut self, agent: &str, task: &str) -> Result<Option<Value>> {
        let key = agent_response_key(agent, task)?;
        Ok(self.get(&key, CATEGORY_RESPONSES))
    }

    // == Warmup ==
    /// Applies warmup items through the domain wrappers.
    ///
    /// Items that cannot be cached are logged and skipped. Returns the number cached.
    pub fn warmup(&mut self, items: &[WarmupItem]) -> usize {
        let mut cached = 0;

        for item in items {
            let result = match item {
                WarmupItem::Pattern {
                    pattern,
                    agents,
                    complexity,
                    success_rate,
                } => self.cache_pattern(pattern, agents, complexity, *success_rate),
                WarmupItem::Doc {
                    library,
                    version,
                    documentation,
                } => self.cache_library_doc(library, version, documentation.clone()),
            };

            match result {
                Ok(()) => cached += 1,
                Err(e) => warn!("Skipping warmup item: {}", e),
            }
        }

        info!("Cache warmed up with {} of {} items", cached, items.len());
        cached
    }
}

fn agent_response_key(agent: &str, task: &str) -> Result<String> {
    generate_key(&json!({"agent": agent, "task": task}), NAMESPACE_AGENT_RESPONSE)
}

fn metadata<const N: usize>(pairs: [(&str, &str); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}
