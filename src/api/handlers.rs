//! API Handlers
//!
//! HTTP request handlers for the cache and recovery status endpoints.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{CacheError, RecoveryError, Result};
use crate::models::{
    CleanupResponse, ClearQuery, ClearResponse, HealthResponse, PatternsResponse,
    PersistResponse, RemediateRequest, RemediateResponse, StatsResponse,
};
use crate::recovery::{ErrorPattern, RecoveryEngine, Strategy};
use crate::runner::TaskRunner;

/// Application state shared across all handlers.
///
/// The cache is wrapped in Arc<RwLock<>> since the store has no internal
/// locking; the engine synchronizes itself.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache store
    pub cache: Arc<RwLock<CacheStore>>,
    /// Shared recovery engine
    pub engine: Arc<RecoveryEngine>,
}

impl AppState {
    /// Creates a new AppState owning the given store and engine.
    pub fn new(cache: CacheStore, engine: RecoveryEngine) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            engine: Arc::new(engine),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The cache starts empty; loading and warmup are left to the caller.
    pub async fn from_config(config: &Config) -> Self {
        let cache = CacheStore::new(config.cache.clone());
        let engine = RecoveryEngine::new(config.recovery.clone()).await;
        Self::new(cache, engine)
    }

    /// Task runner sharing this state's cache and engine.
    pub fn runner(&self) -> TaskRunner {
        TaskRunner::new(self.cache.clone(), self.engine.clone())
    }
}

/// Handler for GET /stats
///
/// Returns cache and recovery statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await.stats();

    Json(StatsResponse {
        cache,
        recovery: state.engine.stats(),
    })
}

/// Handler for POST /cache/cleanup
///
/// Sweeps expired entries now.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.cache.write().await.cleanup();
    Json(CleanupResponse { removed })
}

/// Handler for DELETE /cache?category=
///
/// Clears one category, or everything when no category is given.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.write().await.clear(query.category.as_deref());
    info!("Cleared {} cache entries", removed);

    Ok(Json(ClearResponse::new(query.category, removed)))
}

/// Handler for POST /cache/persist
///
/// Writes the cache to its durable sink. The lock is released before I/O.
pub async fn persist_handler(State(state): State<AppState>) -> Result<Json<PersistResponse>> {
    let (persisted, path) = {
        let cache = state.cache.read().await;
        (cache.to_persisted(), cache.config().persist_path.clone())
    };
    persisted.write_to(&path).await?;

    Ok(Json(PersistResponse {
        persisted: persisted.entries.len(),
        path: path.display().to_string(),
    }))
}

/// Handler for POST /cache/remediate
///
/// Runs the cache-pressure remediation hook. The body is optional.
pub async fn remediate_handler(
    State(state): State<AppState>,
    body: Option<Json<RemediateRequest>>,
) -> Result<Json<RemediateResponse>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let threshold_percent = req.threshold();
    let outcome = state.cache.write().await.remediate(threshold_percent);

    Ok(Json(RemediateResponse {
        threshold_percent,
        outcome,
    }))
}

/// Handler for GET /patterns
pub async fn list_patterns_handler(State(state): State<AppState>) -> Json<PatternsResponse> {
    Json(PatternsResponse {
        patterns: state.engine.patterns().await,
    })
}

/// Handler for POST /patterns
///
/// Appends an error pattern and returns the updated table.
///
/// Patterns carrying a fix action are rejected: file edits and shell
/// commands may only be configured locally.
pub async fn add_pattern_handler(
    State(state): State<AppState>,
    Json(pattern): Json<ErrorPattern>,
) -> std::result::Result<Json<PatternsResponse>, RecoveryError> {
    if let Strategy::Fix { fix: Some(_) } = &pattern.strategy {
        return Err(RecoveryError::InvalidPattern {
            pattern: pattern.pattern,
            reason: "fix actions cannot be registered over HTTP".to_string(),
        });
    }

    state.engine.add_error_pattern(pattern).await?;

    Ok(Json(PatternsResponse {
        patterns: state.engine.patterns().await,
    }))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
