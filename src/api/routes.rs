//! API Routes
//!
//! Configures the Axum router with the status endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_pattern_handler, cleanup_handler, clear_handler, health_handler, list_patterns_handler,
    persist_handler, remediate_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache and recovery statistics
/// - `POST /cache/cleanup` - Sweep expired entries
/// - `DELETE /cache?category=` - Clear one category or everything
/// - `POST /cache/persist` - Persist the cache now
/// - `POST /cache/remediate` - Relieve cache pressure
/// - `GET /patterns`, `POST /patterns` - List or append error patterns
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/cleanup", post(cleanup_handler))
        .route("/cache/persist", post(persist_handler))
        .route("/cache/remediate", post(remediate_handler))
        .route(
            "/patterns",
            get(list_patterns_handler).post(add_pattern_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::config::{CacheConfig, RecoveryConfig};
    use crate::recovery::RecoveryEngine;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    async fn create_test_app(dir: &TempDir) -> Router {
        let cache = CacheStore::new(CacheConfig::with_max_size(1_000));
        let engine = RecoveryEngine::new(RecoveryConfig::in_dir(dir.path())).await;
        create_router(AppState::new(cache, engine))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_not_found() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
