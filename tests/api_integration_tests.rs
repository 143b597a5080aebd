//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use agent_resilience::{
    api::create_router,
    cache::{CacheStore, CATEGORY_DOCS, CATEGORY_RESPONSES},
    config::{CacheConfig, RecoveryConfig},
    AppState, RecoveryEngine,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

async fn create_test_state(dir: &TempDir) -> AppState {
    let cache = CacheStore::new(CacheConfig {
        persist_path: dir.path().join("persistent-cache.json"),
        ..CacheConfig::with_max_size(1_000)
    });
    let engine = RecoveryEngine::new(RecoveryConfig::in_dir(dir.path())).await;
    AppState::new(cache, engine)
}

async fn create_test_app(dir: &TempDir) -> Router {
    create_router(create_test_state(dir).await)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_reports_cache_and_recovery() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir).await;
    {
        let mut cache = state.cache.write().await;
        cache
            .set("a", json!("hello"), CATEGORY_RESPONSES, Map::new())
            .unwrap();
        cache.get("a", CATEGORY_RESPONSES);
        cache.get("missing", CATEGORY_RESPONSES);
    }
    let app = create_router(state);

    let response = app.oneshot(empty_request("GET", "/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["cache"]["total_items"], 1);
    assert_eq!(json["cache"]["hits"], 1);
    assert_eq!(json["cache"]["misses"], 1);
    assert_eq!(json["cache"]["hit_rate"], 0.5);
    assert_eq!(json["cache"]["category_counts"]["responses"], 1);
    assert_eq!(json["recovery"]["totalErrors"], 0);
    assert_eq!(json["recovery"]["successRate"], 100.0);
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_clear_category_endpoint() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir).await;
    {
        let mut cache = state.cache.write().await;
        cache.set("r", json!(1), CATEGORY_RESPONSES, Map::new()).unwrap();
        cache.set("d", json!(2), CATEGORY_DOCS, Map::new()).unwrap();
    }
    let app = create_router(state.clone());

    let response = app
        .oneshot(empty_request("DELETE", "/cache?category=docs"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 1);
    assert_eq!(json["category"], "docs");

    let cache = state.cache.read().await;
    assert!(cache.peek("r").is_some());
    assert!(cache.peek("d").is_none());
}

#[tokio::test]
async fn test_clear_all_endpoint_resets_counters() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir).await;
    {
        let mut cache = state.cache.write().await;
        cache.set("r", json!(1), CATEGORY_RESPONSES, Map::new()).unwrap();
        cache.get("r", CATEGORY_RESPONSES);
    }
    let app = create_router(state.clone());

    let response = app.oneshot(empty_request("DELETE", "/cache")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cache = state.cache.read().await;
    assert!(cache.is_empty());
    assert_eq!(cache.counters().hits, 0);
}

#[tokio::test]
async fn test_clear_blank_category_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(empty_request("DELETE", "/cache?category="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Category"));
}

#[tokio::test]
async fn test_cleanup_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(empty_request("POST", "/cache/cleanup"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 0);
}

#[tokio::test]
async fn test_persist_endpoint_then_reload() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir).await;
    state
        .cache
        .write()
        .await
        .set("kept", json!({"v": 1}), CATEGORY_RESPONSES, Map::new())
        .unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(empty_request("POST", "/cache/persist"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["persisted"], 1);

    let mut reloaded = CacheStore::new(CacheConfig {
        persist_path: dir.path().join("persistent-cache.json"),
        ..CacheConfig::with_max_size(1_000)
    });
    assert_eq!(reloaded.load().await, 1);
    assert_eq!(reloaded.get("kept", CATEGORY_RESPONSES), Some(json!({"v": 1})));
}

#[tokio::test]
async fn test_remediate_endpoint_with_threshold() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir).await;
    state
        .cache
        .write()
        .await
        .set("r", json!("x".repeat(300)), CATEGORY_RESPONSES, Map::new())
        .unwrap();
    let app = create_router(state.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/cache/remediate",
            json!({"threshold_percent": 10.0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["responses_cleared"], 1);
    assert_eq!(json["threshold_percent"], 10.0);
    assert!(state.cache.read().await.is_empty());
}

#[tokio::test]
async fn test_remediate_endpoint_below_threshold_keeps_entries() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir).await;
    state
        .cache
        .write()
        .await
        .set("r", json!("small"), CATEGORY_RESPONSES, Map::new())
        .unwrap();
    let app = create_router(state.clone());

    let response = app
        .oneshot(empty_request("POST", "/cache/remediate"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.cache.read().await.len(), 1);
}

// == Pattern Endpoint Tests ==

#[tokio::test]
async fn test_list_patterns_returns_defaults() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app.oneshot(empty_request("GET", "/patterns")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let patterns = json["patterns"].as_array().unwrap();
    assert!(patterns.iter().any(|p| p["pattern"] == "ECONNREFUSED"));
}

#[tokio::test]
async fn test_add_pattern_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/patterns",
            json!({"pattern": "EACCES", "strategy": "manual", "message": "Permission denied"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let last = json["patterns"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["pattern"], "EACCES");

    let file: Value = serde_json::from_slice(
        &tokio::fs::read(dir.path().join("error-patterns.json"))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(file["patterns"].as_array().unwrap().last().unwrap()["pattern"], "EACCES");
}

#[tokio::test]
async fn test_add_pattern_with_invalid_regex_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/patterns",
            json!({"pattern": "(unclosed", "strategy": "retry"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_pattern_with_unknown_strategy_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/patterns",
            json!({"pattern": "E404", "strategy": "teleport"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_add_pattern_with_command_fix_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/patterns",
            json!({
                "pattern": ".*",
                "strategy": "fix",
                "fix": {"action": "run_command", "command": "rm -rf ~"}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let file: Value = serde_json::from_slice(
        &tokio::fs::read(dir.path().join("error-patterns.json"))
            .await
            .unwrap(),
    )
    .unwrap();
    assert!(file["patterns"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["pattern"] != ".*"));
}
