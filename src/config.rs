//! Environment-backed application configuration.
//!
//! All settings come from environment variables with sensible defaults, so
//! the binaries run against a local database with nothing but `DATABASE_URL`
//! (or `POSTGRESQL_ADDON_URI`) and `LLM_API_KEY` set.

use crate::error::ConfigError;

/// Settings shared by the HTTP server and the `init-db` CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_address: String,
    pub llm: LlmConfig,
    pub dataset: DatasetConfig,
    pub mcp: McpConfig,
}

/// Settings for the external reasoning capability (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key; required before the first query, not at startup.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

/// Settings for the versioned dataset repository.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Remote repository cloned or pulled into the staging directory.
    pub repo_url: String,
    /// Local staging directory the repository is cloned into.
    pub staging_dir: String,
    /// Repository subdirectory holding the schema file and seed directory.
    pub sql_subdir: String,
    /// Schema definition file inside `sql_subdir`.
    pub schema_file: String,
    /// Directory of per-entity seed files inside `sql_subdir`.
    pub seed_dir: String,
}

/// Settings for the external tool-providing process.
#[derive(Debug, Clone)]
pub struct McpConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_address: "0.0.0.0:8080".to_string(),
            llm: LlmConfig {
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                temperature: 0.2,
            },
            dataset: DatasetConfig {
                repo_url: "https://github.com/LostInBrittany/RAGmonsters.git".to_string(),
                staging_dir: "tmp".to_string(),
                sql_subdir: "RAGmonsters/postgresql".to_string(),
                schema_file: "ragmonsters_schema.sql".to_string(),
                seed_dir: "dataset".to_string(),
            },
            mcp: McpConfig {
                command: "npx".to_string(),
                args: vec![
                    "-y".to_string(),
                    "@modelcontextprotocol/server-postgres".to_string(),
                ],
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        } else if let Ok(url) = std::env::var("POSTGRESQL_ADDON_URI") {
            config.database_url = url;
        }

        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|e| ConfigError(format!("invalid PORT: {e}")))?;
            config.bind_address = format!("0.0.0.0:{port}");
        }

        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LLM_API_MODEL") {
            config.llm.model = model;
        }
        if let Ok(url) = std::env::var("LLM_API_URL") {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(url) = std::env::var("DATASET_REPO_URL") {
            config.dataset.repo_url = url;
        }
        if let Ok(dir) = std::env::var("DATASET_STAGING_DIR") {
            config.dataset.staging_dir = dir;
        }

        if let Ok(command) = std::env::var("MCP_SERVER_COMMAND") {
            config.mcp.command = command;
        }
        if let Ok(args) = std::env::var("MCP_SERVER_ARGS") {
            config.mcp.args = args.split_whitespace().map(str::to_string).collect();
        }

        Ok(config)
    }

    /// Database connection string, or an error if none was configured.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        if self.database_url.is_empty() {
            Err(ConfigError(
                "DATABASE_URL (or POSTGRESQL_ADDON_URI) is not set".to_string(),
            ))
        } else {
            Ok(&self.database_url)
        }
    }

    /// Full argv for the MCP server process. The database connection string
    /// is always appended as the final argument.
    pub fn mcp_command_line(&self) -> (String, Vec<String>) {
        let mut args = self.mcp.args.clone();
        args.push(self.database_url.clone());
        (self.mcp.command.clone(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_ragmonsters() {
        let config = AppConfig::default();
        assert!(config.dataset.repo_url.contains("RAGmonsters"));
        assert_eq!(config.dataset.schema_file, "ragmonsters_schema.sql");
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let config = AppConfig::default();
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn mcp_command_line_appends_connection_string() {
        let mut config = AppConfig::default();
        config.database_url = "postgresql://localhost/monsters".to_string();
        let (command, args) = config.mcp_command_line();
        assert_eq!(command, "npx");
        assert_eq!(args.last().unwrap(), "postgresql://localhost/monsters");
    }
}
