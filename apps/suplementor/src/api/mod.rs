//! # Suplementor HTTP API Module
//!
//! This module implements the HTTP JSON API using axum. Every history and
//! knowledge router procedure is exposed as a `POST` taking the router input
//! as its body.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Content counts
//! - `POST /history/list` - `listHistory`
//! - `POST /history/get` - `getHistoryById`
//! - `POST /history/by-system` - `listByMedicineSystem`
//! - `POST /history/timeline` - `getTimeline`
//! - `POST /history/related` - `getRelatedHistory`
//! - `POST /history/search` - `search`
//! - `POST /knowledge/graph` - `getGraph`
//! - `POST /knowledge/node` - `getNode`
//! - `POST /knowledge/related` - `getRelatedNodes`
//! - `POST /knowledge/search` - `searchKnowledge`
//! - `POST /knowledge/path` - `getLearningPath`
//! - `POST /knowledge/filter` - `filterGraph`
//! - `GET /knowledge/statistics` - `getStatistics`
//!
//! ## Security Configuration
//!
//! - `cors_origins` / `SUPLEMENTOR_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `rate_limit` / `SUPLEMENTOR_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)

mod extract;
mod handlers;
mod middleware;
mod types;

pub use handlers::{
    filter_graph_handler, get_history_handler, health_handler, history_by_system_handler,
    knowledge_graph_handler, knowledge_node_handler, learning_path_handler, list_history_handler,
    related_history_handler, related_nodes_handler, search_history_handler,
    search_knowledge_handler, statistics_handler, status_handler, timeline_handler,
};
pub use extract::RouterInput;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{ApiResponse, HealthResponse, StatusResponse};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use suplementor_core::{LazyConnection, SharedStore, SuplementorError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the lazily-opened content store.
#[derive(Clone, Debug)]
pub struct AppState {
    pub connection: Arc<LazyConnection>,
}

impl AppState {
    /// Create app state around a connection handle.
    #[must_use]
    pub fn new(connection: LazyConnection) -> Self {
        Self {
            connection: Arc::new(connection),
        }
    }

    /// The shared store, opening it on first use.
    pub fn store(&self) -> Result<SharedStore, SuplementorError> {
        self.connection.get()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `"*"`: allows all origins (development only)
/// - `None`: localhost only
/// - otherwise: the comma-separated list; invalid entries are skipped
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins.map(str::trim) {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (cors_origins = \"*\"). Do not use in production");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", s);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", s, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit - rejects bodies over 2 MB
/// 4. Rate Limiting - global quota (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = build_cors_layer(config.cors_origins.as_deref());

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/history/list", post(handlers::list_history_handler))
        .route("/history/get", post(handlers::get_history_handler))
        .route("/history/by-system", post(handlers::history_by_system_handler))
        .route("/history/timeline", post(handlers::timeline_handler))
        .route("/history/related", post(handlers::related_history_handler))
        .route("/history/search", post(handlers::search_history_handler))
        .route("/knowledge/graph", post(handlers::knowledge_graph_handler))
        .route("/knowledge/node", post(handlers::knowledge_node_handler))
        .route("/knowledge/related", post(handlers::related_nodes_handler))
        .route("/knowledge/search", post(handlers::search_knowledge_handler))
        .route("/knowledge/path", post(handlers::learning_path_handler))
        .route("/knowledge/filter", post(handlers::filter_graph_handler))
        .route("/knowledge/statistics", get(handlers::statistics_handler));

    if let Some(limiter) = middleware::create_rate_limiter(config.rate_limit) {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server. The store is opened by the first request that needs it.
pub async fn run_server(config: &ServerConfig, connection: LazyConnection) -> Result<(), SuplementorError> {
    let addr = config.bind_addr();
    let router = create_router(AppState::new(connection), config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SuplementorError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Suplementor HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SuplementorError::IoError(format!("Server error: {}", e)))
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use suplementor_core::MemoryStore;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(LazyConnection::ready(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn test_state_shares_one_connection() {
        let a = state();
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.connection, &b.connection));
        assert!(a.connection.is_connected());
    }

    #[test]
    fn test_router_builds_for_every_cors_mode() {
        for origins in [None, Some("*"), Some("https://suplementor.pl, not a header\n"), Some(" , ")] {
            let config = ServerConfig {
                cors_origins: origins.map(str::to_string),
                rate_limit: 0,
                ..ServerConfig::default()
            };
            let _router = create_router(state(), &config);
        }
    }

    #[tokio::test]
    async fn test_body_limit_rejects_oversized_request() {
        let config = ServerConfig {
            rate_limit: 0,
            ..ServerConfig::default()
        };
        let body = format!("{{\"query\":\"{}\"}}", "a".repeat(MAX_BODY_SIZE + 1));
        let request = Request::post("/history/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request");

        let response = create_router(state(), &config)
            .oneshot(request)
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
