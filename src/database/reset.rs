//! Transactional schema reset.
//!
//! Brings the target database to a "no existing schema" state before loading.
//! The presence of a single marker table stands in for "full schema present":
//! if it is absent the reset is a no-op, otherwise every table in the fixed
//! drop list is dropped inside one transaction with constraints deferred, so
//! cross-referencing drops cannot fail on intermediate states. Any failure
//! rolls the whole transaction back; partial drops are never committed.

use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{InitError, InitResult};

/// Ordered drop list plus the marker table checked for idempotency.
///
/// The set is configuration data fixed at orchestration time, not discovered
/// from the catalog. The listed order documents intended dependency depth;
/// correctness does not rely on it because every drop cascades.
#[derive(Debug, Clone)]
pub struct TableSet {
    pub marker: String,
    pub tables: Vec<String>,
}

impl TableSet {
    pub fn new(marker: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            marker: marker.into(),
            tables,
        }
    }

    /// The RAGmonsters schema: dependent tables first, anchor table last.
    pub fn ragmonsters() -> Self {
        Self::new(
            "monsters",
            [
                "hindrances",
                "augments",
                "flaws",
                "abilities",
                "keywords",
                "questworlds_stats",
                "monsters",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        )
    }

    pub fn drop_statement(table: &str) -> String {
        format!("DROP TABLE IF EXISTS \"{table}\" CASCADE")
    }
}

pub struct SchemaReset;

impl SchemaReset {
    /// Run the reset. Returns `Ok(false)` when the marker table was absent
    /// and nothing was dropped, `Ok(true)` when the drop transaction
    /// committed.
    pub async fn run(pool: &PgPool, table_set: &TableSet) -> InitResult<bool> {
        if !Self::marker_table_exists(pool, &table_set.marker).await? {
            info!(
                marker = %table_set.marker,
                "no existing schema found, database is ready for initialization"
            );
            return Ok(false);
        }

        info!(
            marker = %table_set.marker,
            tables = table_set.tables.len(),
            "existing schema found, dropping tables"
        );

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| InitError::ResetFailed(e.to_string()))?;

        let result = Self::drop_all(&mut tx, table_set).await;

        match result {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| InitError::ResetFailed(e.to_string()))?;
                info!("schema reset committed");
                Ok(true)
            }
            Err(err) => {
                // Explicit rollback on the error path; a half-dropped schema
                // must never be left committed.
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    async fn marker_table_exists(pool: &PgPool, marker: &str) -> InitResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_name = $1 AND table_schema = 'public'
            )",
        )
        .bind(marker)
        .fetch_one(pool)
        .await
        .map_err(|e| InitError::ResetFailed(e.to_string()))
    }

    async fn drop_all(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table_set: &TableSet,
    ) -> InitResult<()> {
        sqlx::query("SET CONSTRAINTS ALL DEFERRED")
            .execute(&mut **tx)
            .await
            .map_err(|e| InitError::ResetFailed(e.to_string()))?;

        for table in &table_set.tables {
            debug!(table = %table, "dropping table");
            sqlx::query(&TableSet::drop_statement(table))
                .execute(&mut **tx)
                .await
                .map_err(|e| InitError::ResetFailed(format!("dropping {table}: {e}")))?;
        }

        Ok(())
    }
}
