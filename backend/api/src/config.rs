//! Application configuration loaded from environment variables.

use capledger::{LedgerError, Result, DEFAULT_MAX_COMMIT_RETRIES};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Internal retry bound for commits that lose the per-project race
    pub max_commit_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./capledger.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| LedgerError::Config("Invalid API_PORT".to_string()))?,
            max_commit_retries: env_var("MAX_COMMIT_RETRIES")
                .unwrap_or_else(|_| DEFAULT_MAX_COMMIT_RETRIES.to_string())
                .parse()
                .map_err(|_| LedgerError::Config("Invalid MAX_COMMIT_RETRIES".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| LedgerError::Config(format!("Missing env var: {key}")))
}
