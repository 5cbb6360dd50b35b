//! Dataset repository synchronization.
//!
//! Keeps a local working copy of the versioned dataset repository current:
//! clone when the directory is absent, pull when it exists. A pull failure is
//! only a warning as long as the existing copy still validates; the expected
//! layout (schema file plus seed directory) is re-checked after every sync so
//! a corrupted copy cannot flow into the reset and load stages. The working
//! copy is treated as immutable input for the rest of the run.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::DatasetConfig;
use crate::error::{InitError, InitResult};

/// Validated locations inside the synced working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub schema_file: PathBuf,
    pub seed_dir: PathBuf,
}

pub struct DatasetSync<'a> {
    config: &'a DatasetConfig,
}

impl<'a> DatasetSync<'a> {
    pub fn new(config: &'a DatasetConfig) -> Self {
        Self { config }
    }

    /// Ensure the working copy exists and is current, then validate its
    /// layout.
    pub async fn run(&self) -> InitResult<DatasetLayout> {
        let staging_dir = Path::new(&self.config.staging_dir);
        tokio::fs::create_dir_all(staging_dir)
            .await
            .map_err(|e| InitError::DatasetUnavailable(format!("creating staging dir: {e}")))?;

        let repo_dir = self.repo_dir();
        if repo_dir.is_dir() {
            info!(dir = %repo_dir.display(), "dataset repository already exists, updating");
            if let Err(cause) = git(&repo_dir, &["pull"]).await {
                // The existing copy may still be usable; layout validation
                // below decides whether the run continues.
                warn!(%cause, "dataset update failed, continuing with existing copy");
            }
        } else {
            info!(url = %self.config.repo_url, "cloning dataset repository");
            git(staging_dir, &["clone", self.config.repo_url.as_str()])
                .await
                .map_err(InitError::DatasetUnavailable)?;
        }

        self.validate_layout()
    }

    /// Check that the schema file and seed directory are present, returning
    /// their paths for the loader.
    pub fn validate_layout(&self) -> InitResult<DatasetLayout> {
        let sql_dir = Path::new(&self.config.staging_dir).join(&self.config.sql_subdir);
        let schema_file = sql_dir.join(&self.config.schema_file);
        let seed_dir = sql_dir.join(&self.config.seed_dir);

        if !schema_file.is_file() {
            return Err(InitError::DatasetUnavailable(format!(
                "schema file not found: {}",
                schema_file.display()
            )));
        }
        if !seed_dir.is_dir() {
            return Err(InitError::DatasetUnavailable(format!(
                "seed directory not found: {}",
                seed_dir.display()
            )));
        }

        Ok(DatasetLayout {
            schema_file,
            seed_dir,
        })
    }

    fn repo_dir(&self) -> PathBuf {
        // First path component of the sql subdir is the repository directory
        // inside the staging area ("RAGmonsters/postgresql" -> "RAGmonsters").
        let repo_name = Path::new(&self.config.sql_subdir)
            .components()
            .next()
            .map(|c| c.as_os_str().to_os_string())
            .unwrap_or_default();
        Path::new(&self.config.staging_dir).join(repo_name)
    }
}

async fn git(cwd: &Path, args: &[&str]) -> Result<(), String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| format!("failed to run git {}: {e}", args.join(" ")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::fs;

    fn config_in(staging: &Path) -> DatasetConfig {
        let mut config = AppConfig::default().dataset;
        config.staging_dir = staging.display().to_string();
        config
    }

    #[test]
    fn layout_validation_requires_schema_file_and_seed_dir() {
        let staging = tempfile::tempdir().unwrap();
        let config = config_in(staging.path());
        let sync = DatasetSync::new(&config);

        // Nothing synced yet.
        assert!(matches!(
            sync.validate_layout(),
            Err(InitError::DatasetUnavailable(_))
        ));

        // Schema file alone is not enough.
        let sql_dir = staging.path().join("RAGmonsters/postgresql");
        fs::create_dir_all(&sql_dir).unwrap();
        fs::write(sql_dir.join("ragmonsters_schema.sql"), "CREATE TABLE m ();").unwrap();
        assert!(matches!(
            sync.validate_layout(),
            Err(InitError::DatasetUnavailable(_))
        ));

        // Full layout validates and reports both paths.
        fs::create_dir_all(sql_dir.join("dataset")).unwrap();
        let layout = sync.validate_layout().unwrap();
        assert!(layout.schema_file.ends_with("ragmonsters_schema.sql"));
        assert!(layout.seed_dir.ends_with("dataset"));
    }

    #[test]
    fn repo_dir_is_first_component_of_sql_subdir() {
        let staging = tempfile::tempdir().unwrap();
        let config = config_in(staging.path());
        let sync = DatasetSync::new(&config);
        assert_eq!(sync.repo_dir(), staging.path().join("RAGmonsters"));
    }
}
