//! Request handlers for the query bridge API.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::llm::ChatMessage;
use crate::web::errors::ApiError;
use crate::web::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    query: String,
    response: Vec<ChatMessage>,
    answer: String,
}

/// `GET /api/health`
pub async fn health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// `POST /api/query`
///
/// The query is validated before any session acquisition happens, so a bad
/// request never spawns the tool process.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let query = match request.query {
        Some(query) if !query.trim().is_empty() => query,
        _ => return Err(ApiError::BadRequest("Query is required".to_string())),
    };

    info!(%query, "received query");
    match state.query_service.handle(&query).await {
        Ok(outcome) => Ok(Json(QueryResponse {
            query,
            response: outcome.transcript,
            answer: outcome.answer,
        })),
        Err(err) => {
            error!(error = %err, "error processing query");
            Err(ApiError::Internal(err.to_string()))
        }
    }
}
