//! # Initialization Orchestrator
//!
//! Composes dataset sync, connectivity check, schema reset, and schema load
//! into one end-to-end run with early exit on the first stage failure. The
//! run is all-or-nothing from the caller's perspective: any stage error is
//! propagated with its stage name and the process exits non-zero.
//!
//! Stage order is strict: no stage begins before the prior stage's
//! transaction (if any) has committed or rolled back.

use tracing::info;

use crate::config::AppConfig;
use crate::database::{Database, SchemaLoader, SchemaReset, TableSet};
use crate::dataset::DatasetSync;
use crate::error::InitResult;

/// Outcome of a successful run, reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Whether the reset stage found and dropped an existing schema.
    pub dropped_existing_schema: bool,
    /// Number of seed files applied after the schema definition.
    pub seed_files_applied: usize,
}

pub struct Orchestrator<'a> {
    config: &'a AppConfig,
    table_set: TableSet,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            table_set: TableSet::ragmonsters(),
        }
    }

    pub fn with_table_set(config: &'a AppConfig, table_set: TableSet) -> Self {
        Self { config, table_set }
    }

    /// Run the full initialization sequence once.
    pub async fn run(&self, database_url: &str) -> InitResult<RunReport> {
        // Stage 1-2: staging dir + dataset sync (sync creates the dir).
        info!(stage = "dataset-sync", "starting initialization run");
        let layout = DatasetSync::new(&self.config.dataset).run().await?;

        // Stage 3: connectivity probe. Failure here is a configuration
        // error, aborted immediately with a distinct exit status.
        info!(stage = "connectivity-check", "verifying database connectivity");
        let db = Database::connect(database_url).await?;
        if let Err(err) = db.health_check().await {
            db.close().await;
            return Err(err);
        }
        info!("successfully connected to PostgreSQL database");

        // Stage 4: transactional schema reset.
        info!(stage = "schema-reset", "emptying database");
        let reset_result = SchemaReset::run(db.pool(), &self.table_set).await;
        let dropped = match reset_result {
            Ok(dropped) => dropped,
            Err(err) => {
                db.close().await;
                return Err(err);
            }
        };

        // Stage 5: schema definition, then seed files in name order.
        info!(stage = "schema-load", schema = %layout.schema_file.display(), "loading schema");
        let load_result = async {
            SchemaLoader::apply_file(db.pool(), &layout.schema_file).await?;
            SchemaLoader::apply_dir(db.pool(), &layout.seed_dir).await
        }
        .await;

        // Stage 6: release pooled connections on every outcome.
        db.close().await;

        let seed_files_applied = load_result?;
        info!(
            seed_files = seed_files_applied,
            "database initialization completed successfully"
        );

        Ok(RunReport {
            dropped_existing_schema: dropped,
            seed_files_applied,
        })
    }
}
