//! # Database Layer
//!
//! PostgreSQL access for the initialization pipeline: connection management,
//! transactional schema reset, and SQL file loading.

pub mod connection;
pub mod loader;
pub mod reset;

pub use connection::Database;
pub use loader::SchemaLoader;
pub use reset::{SchemaReset, TableSet};
