//! Database reset-and-seed CLI.
//!
//! Syncs the dataset repository, verifies connectivity, drops any existing
//! schema transactionally, and loads the schema plus every seed file. Exits
//! zero on success; each stage failure has its own non-zero exit code.

use tracing::{error, info};

use querybridge::config::AppConfig;
use querybridge::logging::init_logging;
use querybridge::orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let database_url = match config.require_database_url() {
        Ok(url) => url.to_string(),
        Err(err) => {
            error!(%err, "please set DATABASE_URL or POSTGRESQL_ADDON_URI");
            std::process::exit(1);
        }
    };

    match Orchestrator::new(&config).run(&database_url).await {
        Ok(report) => {
            info!(
                dropped_existing_schema = report.dropped_existing_schema,
                seed_files = report.seed_files_applied,
                "initialization run completed"
            );
        }
        Err(err) => {
            error!(stage = err.stage(), %err, "initialization run failed");
            std::process::exit(err.exit_code());
        }
    }
}
