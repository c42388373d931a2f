//! Integration tests for the Suplementor HTTP API.
//!
//! Uses axum-test to drive the router without starting a real server. The
//! store is a `MemoryStore` seeded from `data/seed.json`.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use suplementor::api::{ApiResponse, AppState, HealthResponse, StatusResponse, create_router};
use suplementor::config::ServerConfig;
use suplementor_core::{
    LazyConnection, MemoryStore, SeedBundle, SuplementorError, SupplementHistoryEntry,
};

const SEED: &str = include_str!("../../../data/seed.json");

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn test_config() -> ServerConfig {
    ServerConfig {
        rate_limit: 0,
        ..ServerConfig::default()
    }
}

fn seeded_state() -> AppState {
    let mut store = MemoryStore::new();
    SeedBundle::from_json(SEED)
        .unwrap()
        .apply_to(&mut store)
        .unwrap();
    AppState::new(LazyConnection::ready(Arc::new(store)))
}

/// Create a test server over the seed bundle.
fn create_test_server() -> TestServer {
    TestServer::new(create_router(seeded_state(), &test_config())).unwrap()
}

/// Create a test server over an empty store.
fn create_empty_test_server() -> TestServer {
    let state = AppState::new(LazyConnection::ready(Arc::new(MemoryStore::new())));
    TestServer::new(create_router(state, &test_config())).unwrap()
}

/// `data` of a successful envelope.
fn data(response: &axum_test::TestResponse) -> Value {
    let body: Value = response.json();
    assert_eq!(body["success"], true, "body: {body}");
    body["data"].clone()
}

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// HEALTH / STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_empty_store() {
    let server = create_empty_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let body: ApiResponse<StatusResponse> = response.json();
    assert_eq!(body.data, Some(StatusResponse::default()));
}

#[tokio::test]
async fn test_status_seeded_store() {
    let server = create_test_server();

    let body: ApiResponse<StatusResponse> = server.get("/status").await.json();
    let status = body.data.unwrap();
    assert_eq!(status.history_entries, 6);
    assert_eq!(status.nodes, 6);
    assert_eq!(status.relationships, 4);
}

// =============================================================================
// HISTORY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_list_history_oldest_first() {
    let server = create_test_server();

    let response = server.post("/history/list").json(&json!({ "limit": 2 })).await;

    response.assert_status_ok();
    let body: ApiResponse<Vec<SupplementHistoryEntry>> = response.json();
    let page = body.data.unwrap();
    let got: Vec<&str> = page.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(got, ["ayur-brahmi", "tcm-ginseng"]);
}

#[tokio::test]
async fn test_list_history_skip_past_end_is_empty() {
    let server = create_test_server();

    let response = server.post("/history/list").json(&json!({ "skip": 50 })).await;

    response.assert_status_ok();
    assert_eq!(data(&response), json!([]));
}

#[tokio::test]
async fn test_list_history_rejects_every_bad_field() {
    let server = create_test_server();

    let response = server
        .post("/history/list")
        .json(&json!({ "limit": 0, "skip": -1 }))
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
    assert!(body.data.is_none());
    let fields: Vec<&str> = body.violations.iter().map(|v| v.field.as_str()).collect();
    assert!(fields.contains(&"limit"));
    assert!(fields.contains(&"skip"));
}

#[tokio::test]
async fn test_get_history_found_and_missing() {
    let server = create_test_server();

    let found = server.post("/history/get").json(&json!({ "id": "greek-sage" })).await;
    found.assert_status_ok();
    assert_eq!(data(&found)["title"], "Sage in De Materia Medica");
    assert_eq!(data(&found)["notablePractitioners"][0]["name"], "Pedanius Dioscorides");

    let missing = server.post("/history/get").json(&json!({ "id": "no-such-entry" })).await;
    missing.assert_status_ok();
    assert_eq!(data(&missing), Value::Null);
}

#[tokio::test]
async fn test_history_by_system_with_era_bounds() {
    let server = create_test_server();

    let response = server
        .post("/history/by-system")
        .json(&json!({ "system": "MODERN_SCIENCE", "eraStartFrom": 1990 }))
        .await;

    response.assert_status_ok();
    assert_eq!(ids(&data(&response)), ["modern-bacopa"]);
}

#[tokio::test]
async fn test_history_by_system_rejects_unknown_tag() {
    let server = create_test_server();

    let response = server
        .post("/history/by-system")
        .json(&json!({ "system": "tcm" }))
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.violations[0].field, "system");
}

#[tokio::test]
async fn test_timeline_is_a_projection() {
    let server = create_test_server();

    let response = server.post("/history/timeline").json(&json!({})).await;

    response.assert_status_ok();
    let timeline = data(&response);
    assert_eq!(timeline.as_array().unwrap().len(), 6);
    assert_eq!(timeline[0]["id"], "ayur-brahmi");
    assert!(timeline[0].get("description").is_none());

    let tcm = server
        .post("/history/timeline")
        .json(&json!({ "system": "TCM" }))
        .await;
    assert_eq!(ids(&data(&tcm)), ["tcm-ginseng"]);
}

#[tokio::test]
async fn test_related_history_for_supplement() {
    let server = create_test_server();

    let response = server
        .post("/history/related")
        .json(&json!({ "supplementId": "bacopa" }))
        .await;

    response.assert_status_ok();
    assert_eq!(ids(&data(&response)), ["ayur-brahmi", "modern-bacopa"]);
}

#[tokio::test]
async fn test_search_ranked_then_fallback() {
    let server = create_test_server();

    let ranked = server
        .post("/history/search")
        .json(&json!({ "query": "ginseng" }))
        .await;
    ranked.assert_status_ok();
    let ranked = data(&ranked);
    assert_eq!(ranked["mode"], "RANKED");
    assert_eq!(ids(&ranked["entries"]), ["tcm-ginseng"]);

    // "ginsen" is no whole token, so only substring matching finds it.
    let fallback = server
        .post("/history/search")
        .json(&json!({ "query": "ginsen" }))
        .await;
    fallback.assert_status_ok();
    let fallback = data(&fallback);
    assert_eq!(fallback["mode"], "FALLBACK");
    let mut found = ids(&fallback["entries"]);
    found.sort();
    assert_eq!(found, ["modern-ginseng", "tcm-ginseng"]);
}

#[tokio::test]
async fn test_search_rejects_blank_query() {
    let server = create_test_server();

    let response = server
        .post("/history/search")
        .json(&json!({ "query": "   " }))
        .await;

    response.assert_status_bad_request();
}

// =============================================================================
// KNOWLEDGE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_knowledge_graph_cap_keeps_most_important() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/graph")
        .json(&json!({ "maxNodes": 2 }))
        .await;

    response.assert_status_ok();
    let graph = data(&response);
    assert_eq!(ids(&graph["nodes"]), ["memory", "acetylcholine"]);
    assert_eq!(graph["relationships"], json!([]));
    assert_eq!(graph["totalNodes"], 2);
}

#[tokio::test]
async fn test_knowledge_graph_around_center() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/graph")
        .json(&json!({ "centerNodeId": "hippocampus" }))
        .await;

    let graph = data(&response);
    assert_eq!(ids(&graph["nodes"]), ["memory", "acetylcholine", "hippocampus"]);
    assert_eq!(graph["totalRelationships"], 2);
}

#[tokio::test]
async fn test_knowledge_node_splits_directions() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/node")
        .json(&json!({ "id": "hippocampus" }))
        .await;

    response.assert_status_ok();
    let node = data(&response);
    assert_eq!(node["id"], "hippocampus");
    assert_eq!(node["type"], "BRAIN_REGION");
    assert_eq!(ids(&node["sourceRelationships"]), ["hippocampus-memory"]);
    assert_eq!(ids(&node["targetRelationships"]), ["acetylcholine-hippocampus"]);

    let missing = server
        .post("/knowledge/node")
        .json(&json!({ "id": "rhodiola" }))
        .await;
    missing.assert_status_ok();
    assert_eq!(data(&missing), Value::Null);
}

#[tokio::test]
async fn test_related_nodes_breadth_first() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/related")
        .json(&json!({ "nodeId": "bacopa", "depth": 2 }))
        .await;

    response.assert_status_ok();
    let related = data(&response);
    assert_eq!(ids(&related["nodes"]), ["bacopa", "acetylcholine", "hippocampus"]);
    assert_eq!(related["centerNodeId"], "bacopa");
}

#[tokio::test]
async fn test_related_nodes_depth_out_of_range() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/related")
        .json(&json!({ "nodeId": "bacopa", "depth": 4 }))
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.violations[0].field, "depth");
}

#[tokio::test]
async fn test_search_knowledge_case_insensitive() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/search")
        .json(&json!({ "query": "MEMORY" }))
        .await;

    // "consolidates memories" on hippocampus is not a literal match for "memory"
    response.assert_status_ok();
    assert_eq!(ids(&data(&response)), ["memory", "acetylcholine", "bacopa"]);
}

#[tokio::test]
async fn test_learning_path_found_and_unreachable() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/path")
        .json(&json!({ "startNodeId": "bacopa", "endNodeId": "memory" }))
        .await;
    response.assert_status_ok();
    let path = data(&response);
    assert_eq!(path["found"], true);
    assert_eq!(
        ids(&path["path"]),
        ["bacopa", "acetylcholine", "hippocampus", "memory"]
    );
    assert_eq!(path["estimatedTime"], 60);
    assert_eq!(path["difficulty"], "INTERMEDIATE");

    let unreachable = server
        .post("/knowledge/path")
        .json(&json!({ "startNodeId": "bacopa", "endNodeId": "zinc" }))
        .await;
    let unreachable = data(&unreachable);
    assert_eq!(unreachable["found"], false);
    assert_eq!(unreachable["path"], json!([]));
}

#[tokio::test]
async fn test_filter_graph_by_node_type() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/filter")
        .json(&json!({ "nodeTypes": ["SUPPLEMENT", "NEUROTRANSMITTER"] }))
        .await;

    response.assert_status_ok();
    let view = data(&response);
    // Untruncated views keep store order, which is id order here.
    assert_eq!(ids(&view["nodes"]), ["acetylcholine", "bacopa", "ginseng"]);
    assert_eq!(ids(&view["relationships"]), ["bacopa-acetylcholine"]);
    assert_eq!(view["truncated"], false);
}

#[tokio::test]
async fn test_filter_graph_reports_every_violation() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/filter")
        .json(&json!({
            "nodeTypes": ["SUPPLEMENT", "HERB"],
            "minStrength": 1.5,
            "maxNodes": 0
        }))
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    let fields: Vec<&str> = body.violations.iter().map(|v| v.field.as_str()).collect();
    assert!(fields.contains(&"nodeTypes[1]"));
    assert!(fields.contains(&"minStrength"));
    assert!(fields.contains(&"maxNodes"));
}

#[tokio::test]
async fn test_statistics() {
    let server = create_test_server();

    let response = server.get("/knowledge/statistics").await;

    response.assert_status_ok();
    let stats = data(&response);
    assert_eq!(stats["totalNodes"], 6);
    assert_eq!(stats["totalRelationships"], 4);
    assert_eq!(stats["nodesByType"][0], json!({ "type": "SUPPLEMENT", "count": 2 }));
}

// =============================================================================
// STORE FAILURE TESTS
// =============================================================================

#[tokio::test]
async fn test_store_failure_is_opaque_500() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let connection = LazyConnection::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(SuplementorError::StoreError(
            "redb: /secret/path/content.db is locked".to_string(),
        ))
    });
    let server =
        TestServer::new(create_router(AppState::new(connection), &test_config())).unwrap();

    let response = server.post("/history/list").json(&json!({})).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.error.as_deref(), Some("Internal server error"));
    assert!(!response.text().contains("/secret/path"));

    // A failed connect is retried by the next request.
    let _ = server.get("/status").await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    // Health never touches the store.
    server.get("/health").await.assert_status_ok();
}

// =============================================================================
// MIDDLEWARE TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let config = ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    };
    let server = TestServer::new(create_router(seeded_state(), &config)).unwrap();

    server.get("/health").await.assert_status_ok();
    let limited = server.get("/health").await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: ApiResponse<Value> = limited.json();
    assert!(!body.success);
}

#[tokio::test]
async fn test_cors_allows_localhost_by_default() {
    let server = create_test_server();

    let response = server
        .get("/health")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:3000"))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("http://localhost:3000"))
    );
}

#[tokio::test]
async fn test_cors_rejects_unlisted_origin() {
    let config = ServerConfig {
        rate_limit: 0,
        cors_origins: Some("https://suplementor.pl".to_string()),
        ..ServerConfig::default()
    };
    let server = TestServer::new(create_router(seeded_state(), &config)).unwrap();

    let response = server
        .get("/health")
        .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example"))
        .await;

    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let server = create_test_server();

    let response = server.get("/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = create_test_server();

    // /history/list is POST only
    let response = server.get("/history/list").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = create_test_server();

    let response = server
        .post("/history/search")
        .text("not valid json")
        .content_type("application/json")
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
    assert_eq!(body.violations.len(), 1);
    assert_eq!(body.violations[0].field, "body");
}

#[tokio::test]
async fn test_wrongly_typed_fields_all_reported() {
    let server = create_test_server();

    let response = server
        .post("/history/list")
        .json(&json!({ "limit": "ten", "skip": "zero" }))
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
    assert_eq!(body.error.as_deref(), Some("Invalid input"));
    let mut fields: Vec<&str> = body.violations.iter().map(|v| v.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, ["limit", "skip"]);
}

#[tokio::test]
async fn test_filter_wrong_types_all_reported() {
    let server = create_test_server();

    let response = server
        .post("/knowledge/filter")
        .json(&json!({ "maxNodes": "many", "nodeTypes": "SUPPLEMENT" }))
        .await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert!(body.violations.iter().any(|v| v.field == "maxNodes"));
    assert!(body.violations.iter().any(|v| v.field == "nodeTypes"));
}

#[tokio::test]
async fn test_missing_content_type_keeps_envelope() {
    let server = create_test_server();

    let response = server.post("/history/list").text("{}").await;

    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
}
