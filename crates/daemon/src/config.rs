//! Daemon configuration
//!
//! Built-in defaults overlaid with `WAITLINE_*` environment variables
//! (e.g. `WAITLINE_DB_PATH`, `WAITLINE_RPC_PORT`).

use config::{Config, Environment};
use serde::Deserialize;
use waitline_core::error::AppError;

const DEFAULT_DB_PATH: &str = "~/.waitline/queue.db";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9528;
const DEFAULT_QUEUE: &str = "myQueue";
const DEFAULT_LOG_FORMAT: &str = "pretty";
const ENV_PREFIX: &str = "WAITLINE";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DaemonConfig {
    /// SQLite database file (tilde-expanded)
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// Queue used when a request names none; created at start-up
    pub default_queue: String,
    pub max_transaction_attempts: u32,
    /// `pretty` or `json`
    pub log_format: String,
}

impl DaemonConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self, AppError> {
        Self::from_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_source(env: Environment) -> Result<Self, AppError> {
        let settings = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)
            .and_then(|b| b.set_default("rpc_host", DEFAULT_RPC_HOST))
            .and_then(|b| b.set_default("rpc_port", i64::from(DEFAULT_RPC_PORT)))
            .and_then(|b| b.set_default("default_queue", DEFAULT_QUEUE))
            .and_then(|b| {
                b.set_default(
                    "max_transaction_attempts",
                    i64::from(waitline_core::application::constants::DEFAULT_MAX_TRANSACTION_ATTEMPTS),
                )
            })
            .and_then(|b| b.set_default("log_format", DEFAULT_LOG_FORMAT))
            .map_err(|e| AppError::Config(e.to_string()))?
            .add_source(env)
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let mut config: DaemonConfig = settings
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.db_path = shellexpand::tilde(&config.db_path).into_owned();

        if config.max_transaction_attempts == 0 {
            return Err(AppError::Config(
                "max_transaction_attempts must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::from_source(env(&[])).unwrap();

        assert_eq!(config.rpc_host, "127.0.0.1");
        assert_eq!(config.rpc_port, 9528);
        assert_eq!(config.default_queue, "myQueue");
        assert_eq!(config.max_transaction_attempts, 5);
        assert_eq!(config.log_format, "pretty");
        assert!(!config.db_path.starts_with('~'));
        assert!(config.db_path.ends_with(".waitline/queue.db"));
    }

    #[test]
    fn test_environment_overrides() {
        let config = DaemonConfig::from_source(env(&[
            ("WAITLINE_RPC_PORT", "7000"),
            ("WAITLINE_DB_PATH", "/tmp/w.db"),
            ("WAITLINE_DEFAULT_QUEUE", "desk"),
            ("WAITLINE_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.rpc_port, 7000);
        assert_eq!(config.db_path, "/tmp/w.db");
        assert_eq!(config.default_queue, "desk");
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = DaemonConfig::from_source(env(&[("WAITLINE_MAX_TRANSACTION_ATTEMPTS", "0")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_port() {
        let err = DaemonConfig::from_source(env(&[("WAITLINE_RPC_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
