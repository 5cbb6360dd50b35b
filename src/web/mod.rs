//! # Web API Module
//!
//! Axum-based HTTP boundary for the query bridge:
//!
//! - `GET /api/health` - liveness check
//! - `POST /api/query` - natural-language query
//!
//! The handlers are thin glue over [`crate::query::QueryService`]; the
//! session manager in the shared state owns the one live tool connection.

pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Create the Axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/query", post(handlers::query))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
