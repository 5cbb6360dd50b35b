//! PostgreSQL connection pool wrapper.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::error::{InitError, InitResult};

/// Owns the connection pool for one initialization run or one server process.
/// Connections are checked out per operation and returned by sqlx on every
/// exit path, including errors.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database. A failure here is a configuration problem,
    /// reported as `ConnectivityFailure` and never retried.
    pub async fn connect(database_url: &str) -> InitResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| InitError::ConnectivityFailure(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lightweight probe used as the orchestrator's connectivity check.
    pub async fn health_check(&self) -> InitResult<()> {
        let row = sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| InitError::ConnectivityFailure(e.to_string()))?;

        let health: i32 = row
            .try_get("health")
            .map_err(|e| InitError::ConnectivityFailure(e.to_string()))?;
        if health == 1 {
            Ok(())
        } else {
            Err(InitError::ConnectivityFailure(
                "health probe returned unexpected value".to_string(),
            ))
        }
    }

    /// Release all pooled connections held by this run.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
