//! # API Endpoint Handlers
//!
//! Thin adapters from HTTP to the core routers. Every router endpoint takes
//! the router input as its JSON body and answers with [`ApiResponse`]:
//!
//! - body that is not JSON or has wrongly typed fields: 400 with every bad field
//! - validation failure: 400 with every violated field
//! - store/serialization/io failure: 500 with an opaque message
//! - single lookup that found nothing: 200 with `data: null`

use super::{
    AppState,
    extract::RouterInput,
    types::{ApiResponse, HealthResponse, StatusResponse},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use suplementor_core::{
    GetGraphInput, GetHistoryByIdInput, GetNodeInput, GraphFilterInput, HistoryFilter,
    HistoryRouter, KnowledgeRouter, LearningPathInput, ListByMedicineSystemInput,
    ListHistoryInput, RelatedHistoryInput, RelatedNodesInput, SearchHistoryInput,
    SearchKnowledgeInput, SuplementorError, TimelineInput,
};

// =============================================================================
// RESPONSE MAPPING
// =============================================================================

/// Map a router result onto status code and envelope.
fn respond<T: Serialize>(operation: &'static str, result: Result<T, SuplementorError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) if e.is_validation() => {
            tracing::debug!(operation, error = %e, "rejected input");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::<T>::from_error(&e))).into_response()
        }
        Err(e) => {
            tracing::error!(operation, error = %e, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<T>::from_error(&e)),
            )
                .into_response()
        }
    }
}

// =============================================================================
// HEALTH / STATUS HANDLERS
// =============================================================================

/// Health check endpoint. Never touches the store.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Content counts. Opens the store if nothing has yet.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let result = state.store().and_then(|store| {
        Ok(StatusResponse {
            history_entries: store.count_history(&HistoryFilter::default())?,
            nodes: store.node_count()?,
            relationships: store.relationship_count()?,
        })
    });
    respond("status", result)
}

// =============================================================================
// HISTORY HANDLERS
// =============================================================================

/// `POST /history/list`
pub async fn list_history_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<ListHistoryInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| HistoryRouter::new(store.as_ref()).list_history(&input));
    respond("listHistory", result)
}

/// `POST /history/get`
pub async fn get_history_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<GetHistoryByIdInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| HistoryRouter::new(store.as_ref()).get_history_by_id(&input));
    respond("getHistoryById", result)
}

/// `POST /history/by-system`
pub async fn history_by_system_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<ListByMedicineSystemInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| HistoryRouter::new(store.as_ref()).list_by_medicine_system(&input));
    respond("listByMedicineSystem", result)
}

/// `POST /history/timeline`
pub async fn timeline_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<TimelineInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| HistoryRouter::new(store.as_ref()).get_timeline(&input));
    respond("getTimeline", result)
}

/// `POST /history/related`
pub async fn related_history_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<RelatedHistoryInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| HistoryRouter::new(store.as_ref()).get_related_history(&input));
    respond("getRelatedHistory", result)
}

/// `POST /history/search`
pub async fn search_history_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<SearchHistoryInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| HistoryRouter::new(store.as_ref()).search(&input));
    respond("search", result)
}

// =============================================================================
// KNOWLEDGE HANDLERS
// =============================================================================

/// `POST /knowledge/graph`
pub async fn knowledge_graph_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<GetGraphInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).get_graph(&input));
    respond("getGraph", result)
}

/// `POST /knowledge/node`
pub async fn knowledge_node_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<GetNodeInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).get_node(&input));
    respond("getNode", result)
}

/// `POST /knowledge/related`
pub async fn related_nodes_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<RelatedNodesInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).get_related_nodes(&input));
    respond("getRelatedNodes", result)
}

/// `POST /knowledge/search`
pub async fn search_knowledge_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<SearchKnowledgeInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).search_knowledge(&input));
    respond("searchKnowledge", result)
}

/// `POST /knowledge/path`
pub async fn learning_path_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<LearningPathInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).get_learning_path(&input));
    respond("getLearningPath", result)
}

/// `POST /knowledge/filter`
pub async fn filter_graph_handler(
    State(state): State<AppState>,
    RouterInput(input): RouterInput<GraphFilterInput>,
) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).filter_graph(&input));
    respond("filterGraph", result)
}

/// `GET /knowledge/statistics`
pub async fn statistics_handler(State(state): State<AppState>) -> Response {
    let result = state
        .store()
        .and_then(|store| KnowledgeRouter::new(store.as_ref()).get_statistics());
    respond("getStatistics", result)
}
