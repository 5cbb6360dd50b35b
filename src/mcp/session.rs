//! Tool session lifecycle management.
//!
//! Owns the single live connection to the tool-providing process. The
//! lifecycle is `Unstarted -> Acquiring -> Ready -> Closed`: the first
//! `acquire()` establishes the connection and discovers the tool catalog,
//! later calls reuse the same handle, and `release()` tears everything down.
//! The state sits behind an async mutex held across the connect await, so
//! concurrent `acquire()` calls serialize on one in-flight initialization
//! and at most one transport connection is ever opened.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{SessionError, SessionResult};
use crate::mcp::client::{McpClient, ToolDescriptor};

/// One live pairing of a transport connection and its discovered tool
/// catalog. Either both are populated or the session does not exist.
#[async_trait]
pub trait ToolSession: Send + Sync {
    fn tools(&self) -> &[ToolDescriptor];
    async fn call_tool(&self, name: &str, args: Value) -> SessionResult<String>;
    async fn close(&self);
}

impl std::fmt::Debug for dyn ToolSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ToolSession")
    }
}

/// Connection factory seam. Production uses [`McpBackend`]; tests inject
/// fakes to observe connection counts and inject failures.
#[async_trait]
pub trait ToolBackend: Send + Sync + 'static {
    async fn connect(&self) -> SessionResult<Arc<dyn ToolSession>>;
}

enum SessionState {
    Unstarted,
    Acquiring,
    Ready(Arc<dyn ToolSession>),
    Closed,
}

/// Process-wide manager guaranteeing at most one live session.
pub struct SessionManager {
    backend: Arc<dyn ToolBackend>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn ToolBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState::Unstarted),
        }
    }

    /// Return the live session, establishing it on first demand.
    ///
    /// A failed initialization leaves the manager in `Unstarted` so a later
    /// call can retry. Once released, the manager stays closed.
    pub async fn acquire(&self) -> SessionResult<Arc<dyn ToolSession>> {
        let mut state = self.state.lock().await;
        match &*state {
            SessionState::Ready(session) => Ok(Arc::clone(session)),
            SessionState::Closed => Err(SessionError::Closed),
            // Acquiring is unobservable here because the lock is held for
            // the whole transition; treat it like Unstarted and retry.
            SessionState::Unstarted | SessionState::Acquiring => {
                *state = SessionState::Acquiring;
                match self.backend.connect().await {
                    Ok(session) => {
                        info!(tools = session.tools().len(), "tool session established");
                        *state = SessionState::Ready(Arc::clone(&session));
                        Ok(session)
                    }
                    Err(err) => {
                        *state = SessionState::Unstarted;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Close the session if one is live. Idempotent: releasing an already
    /// closed or never-started manager does nothing.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, SessionState::Closed) {
            SessionState::Ready(session) => {
                info!("closing tool session");
                session.close().await;
            }
            SessionState::Acquiring => {}
            SessionState::Unstarted => {
                // Never started: stay out of Closed so a later acquire works.
                *state = SessionState::Unstarted;
            }
            SessionState::Closed => {}
        }
    }

    /// Whether a live session currently exists (no side effects).
    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Ready(_))
    }
}

/// Production backend: spawns the configured MCP server process and
/// discovers its tool catalog.
pub struct McpBackend {
    command: String,
    args: Vec<String>,
    database_url: String,
}

impl McpBackend {
    pub fn from_config(config: &AppConfig) -> Self {
        let (command, args) = config.mcp_command_line();
        Self {
            command,
            args,
            database_url: config.database_url.clone(),
        }
    }
}

#[async_trait]
impl ToolBackend for McpBackend {
    async fn connect(&self) -> SessionResult<Arc<dyn ToolSession>> {
        // Required connection configuration is checked before any spawn.
        if self.database_url.is_empty() {
            return Err(SessionError::InitFailed(
                "DATABASE_URL (or POSTGRESQL_ADDON_URI) is not set".to_string(),
            ));
        }

        let client = McpClient::connect(&self.command, &self.args)
            .await
            .map_err(|err| match err {
                SessionError::InitFailed(_) => err,
                other => SessionError::InitFailed(other.to_string()),
            })?;

        let tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(err) => {
                // All-or-nothing construction: no catalog, no session.
                client.close().await;
                return Err(SessionError::InitFailed(err.to_string()));
            }
        };
        if tools.is_empty() {
            client.close().await;
            return Err(SessionError::InitFailed(
                "MCP server exposes no tools".to_string(),
            ));
        }

        Ok(Arc::new(McpSession { client, tools }))
    }
}

struct McpSession {
    client: McpClient,
    tools: Vec<ToolDescriptor>,
}

#[async_trait]
impl ToolSession for McpSession {
    fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn call_tool(&self, name: &str, args: Value) -> SessionResult<String> {
        self.client.call_tool(name, args).await
    }

    async fn close(&self) {
        self.client.close().await;
    }
}

/// Resolve when the process receives SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
