//! # querybridge
//!
//! Natural-language query bridge for PostgreSQL. An LLM reasoning loop is
//! wired to the SQL tools exposed by an external MCP server process, behind a
//! small HTTP API; a separate CLI fetches the versioned RAGmonsters dataset
//! and (re)initializes the database transactionally.
//!
//! ## Architecture
//!
//! - [`mcp`] - stdio JSON-RPC client for the tool process and the session
//!   lifecycle manager (one live connection per process)
//! - [`llm`] - reasoning capability seam and OpenAI-compatible client
//! - [`query`] - bridge from a natural-language query to a transcript/answer
//! - [`dataset`] / [`database`] / [`orchestrator`] - the reset-and-seed
//!   initialization pipeline behind the `init-db` binary
//! - [`web`] - Axum HTTP boundary behind the `server` binary

pub mod config;
pub mod database;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod query;
pub mod web;

pub use config::AppConfig;
pub use error::{InitError, QueryError, SessionError};
