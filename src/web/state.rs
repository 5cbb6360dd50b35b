//! Shared application state for the web API.

use std::sync::Arc;

use crate::mcp::SessionManager;
use crate::query::QueryService;

/// State shared across request handlers: the session manager owning the one
/// live tool connection, and the query service bridging to the reasoner.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub query_service: Arc<QueryService>,
}

impl AppState {
    pub fn new(session: Arc<SessionManager>, query_service: Arc<QueryService>) -> Self {
        Self {
            session,
            query_service,
        }
    }
}
