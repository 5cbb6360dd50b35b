//! HTTP server binary for the query bridge.
//!
//! Serves the query API and warms the tool session at startup. On SIGINT or
//! SIGTERM the server drains and the tool session is released before exit.

use std::sync::Arc;
use tracing::{error, info, warn};

use querybridge::config::AppConfig;
use querybridge::llm::OpenAiReasoner;
use querybridge::logging::init_logging;
use querybridge::mcp::session::wait_for_shutdown_signal;
use querybridge::mcp::{McpBackend, SessionManager};
use querybridge::query::QueryService;
use querybridge::web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env().map_err(|err| {
        error!(%err, "invalid configuration");
        anyhow::anyhow!(err)
    })?;

    let session = Arc::new(SessionManager::new(Arc::new(McpBackend::from_config(
        &config,
    ))));
    let reasoner = Arc::new(OpenAiReasoner::from_config(&config.llm));
    let query_service = Arc::new(QueryService::new(Arc::clone(&session), reasoner));
    let state = AppState::new(Arc::clone(&session), query_service);

    let app = querybridge::web::create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "server listening");

    // Warm the session so the first query does not pay the spawn cost. A
    // failure here is logged and retried lazily on the first query.
    match session.acquire().await {
        Ok(handle) => info!(tools = handle.tools().len(), "tool session ready"),
        Err(err) => warn!(%err, "tool session not ready yet, will retry on first query"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    info!("shutting down, releasing tool session");
    session.release().await;
    Ok(())
}
