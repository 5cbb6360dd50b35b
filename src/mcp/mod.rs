//! # MCP Tool Access
//!
//! Client for an external tool-providing process speaking the Model Context
//! Protocol over stdio, plus the session lifecycle manager that guarantees at
//! most one live connection per process.

pub mod client;
pub mod session;

pub use client::{McpClient, ToolDescriptor};
pub use session::{McpBackend, SessionManager, ToolBackend, ToolSession};
