//! Error types for the query bridge and the initialization pipeline.

use thiserror::Error;

/// Errors raised by the database initialization run.
///
/// Each variant maps to one stage of the run, and each stage failure carries
/// its own process exit code so operators can distinguish a configuration
/// problem (unreachable database) from a data problem (bad seed file).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("dataset unavailable: {0}")]
    DatasetUnavailable(String),
    #[error("database connectivity failure: {0}")]
    ConnectivityFailure(String),
    #[error("schema reset failed: {0}")]
    ResetFailed(String),
    #[error("load failed for {file}: {cause}")]
    LoadFailed { file: String, cause: String },
}

impl InitError {
    /// Process exit code for the `init-db` binary. Zero is success; 1 is
    /// reserved for configuration/setup errors outside the staged run.
    pub fn exit_code(&self) -> i32 {
        match self {
            InitError::DatasetUnavailable(_) => 2,
            InitError::ConnectivityFailure(_) => 3,
            InitError::ResetFailed(_) => 4,
            InitError::LoadFailed { .. } => 5,
        }
    }

    /// The stage name logged when the run aborts.
    pub fn stage(&self) -> &'static str {
        match self {
            InitError::DatasetUnavailable(_) => "dataset-sync",
            InitError::ConnectivityFailure(_) => "connectivity-check",
            InitError::ResetFailed(_) => "schema-reset",
            InitError::LoadFailed { .. } => "schema-load",
        }
    }
}

/// Errors raised by the tool session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Connection configuration was absent or the transport/catalog discovery
    /// step failed. The manager stays in `Unstarted` so acquire can retry.
    #[error("session initialization failed: {0}")]
    InitFailed(String),
    /// The manager was released; no further sessions will be handed out.
    #[error("session manager is closed")]
    Closed,
    #[error("tool transport error: {0}")]
    Transport(String),
    #[error("tool call '{name}' failed: {cause}")]
    ToolCall { name: String, cause: String },
}

/// Error raised by the query bridge. Any session or reasoning failure is
/// folded into a single cause; there is no partial answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query failed: {0}")]
pub struct QueryError(pub String);

impl From<SessionError> for QueryError {
    fn from(err: SessionError) -> Self {
        QueryError(err.to_string())
    }
}

/// Configuration errors raised while loading environment settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

pub type InitResult<T> = std::result::Result<T, InitError>;
pub type SessionResult<T> = std::result::Result<T, SessionError>;
pub type QueryResult<T> = std::result::Result<T, QueryError>;
