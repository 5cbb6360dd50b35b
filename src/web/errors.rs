//! Web API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Structured error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// API-level errors mapped onto HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    /// Request was malformed (missing or empty `query`).
    BadRequest(String),
    /// Query processing failed internally; the cause goes into `message`.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    message: None,
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to process query".to_string(),
                    message: Some(message),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}
