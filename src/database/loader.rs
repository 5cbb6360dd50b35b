//! SQL file loading.
//!
//! Applies the schema definition file and then every seed file in a
//! directory, in file-name order. Each file is executed as its own statement
//! batch: a failure stops the load at that file so a partially-related
//! dataset state is never assembled, but earlier files stay applied. This is
//! deliberately not wrapped in the reset's transaction.

use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{InitError, InitResult};

pub struct SchemaLoader;

impl SchemaLoader {
    /// Execute one SQL file as a raw statement batch.
    pub async fn apply_file(pool: &PgPool, path: &Path) -> InitResult<()> {
        let file_name = display_name(path);
        info!(file = %file_name, "executing SQL file");

        let sql = tokio::fs::read_to_string(path).await.map_err(|e| {
            InitError::LoadFailed {
                file: file_name.clone(),
                cause: e.to_string(),
            }
        })?;

        sqlx::raw_sql(&sql)
            .execute(pool)
            .await
            .map_err(|e| InitError::LoadFailed {
                file: file_name,
                cause: e.to_string(),
            })?;

        Ok(())
    }

    /// Apply every `.sql` file in `dir`, sorted by name, stopping at the
    /// first failure.
    pub async fn apply_dir(pool: &PgPool, dir: &Path) -> InitResult<usize> {
        let files = Self::sql_files_sorted(dir)?;
        info!(dir = %dir.display(), count = files.len(), "found seed files to import");

        for file in &files {
            Self::apply_file(pool, file).await?;
        }

        Ok(files.len())
    }

    /// List the `.sql` files in a directory, sorted by file name for
    /// deterministic load order. Non-SQL files are ignored.
    pub fn sql_files_sorted(dir: &Path) -> InitResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|e| InitError::LoadFailed {
            file: dir.display().to_string(),
            cause: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == "sql").unwrap_or(false)
            })
            .collect();

        files.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
        Ok(files)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sql_files_are_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_monster.sql"), "SELECT 2;").unwrap();
        fs::write(dir.path().join("a_monster.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("README.md"), "not sql").unwrap();
        fs::write(dir.path().join("c_monster.SQL.bak"), "not sql either").unwrap();

        let files = SchemaLoader::sql_files_sorted(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a_monster.sql", "b_monster.sql"]);
    }

    #[test]
    fn missing_directory_is_a_load_failure() {
        let err = SchemaLoader::sql_files_sorted(Path::new("/nonexistent/seeds")).unwrap_err();
        assert!(matches!(err, InitError::LoadFailed { .. }));
    }
}
