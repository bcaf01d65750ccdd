//! Till configuration module.
//!
//! Settings are layered: built-in defaults, then an optional `till.toml`
//! in the working directory, then `TILL_*` environment variables.
//!
//! ```text
//! TILL_DATABASE_PATH=/var/lib/till/till.db
//! TILL_MAX_CONNECTIONS=8
//! TILL_BUSY_TIMEOUT_MS=2000
//! TILL_RUN_MIGRATIONS=false
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pool::DbConfig;

/// Default settings file, looked up without extension (`till.toml`).
pub const DEFAULT_CONFIG_NAME: &str = "till";

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "TILL";

/// Till backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TillConfig {
    /// SQLite database file (`:memory:` for a throwaway database)
    pub database_path: String,

    /// Pool upper bound
    pub max_connections: u32,

    /// Connections kept open while idle
    pub min_connections: u32,

    /// Pool acquire timeout in seconds
    pub connect_timeout_secs: u64,

    /// Idle connection lifetime in seconds
    pub idle_timeout_secs: u64,

    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,

    /// Apply embedded migrations on connect
    pub run_migrations: bool,

    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl TillConfig {
    /// Loads `till.toml` (if present) plus `TILL_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_NAME)
    }

    /// Loads from an explicit settings file name (extension optional),
    /// still honoring `TILL_*` overrides.
    pub fn load_from(name: &str) -> Result<Self, ConfigError> {
        let config: TillConfig = config::Config::builder()
            .set_default("database_path", "till.db")?
            .set_default("max_connections", 5)?
            .set_default("min_connections", 1)?
            .set_default("connect_timeout_secs", 30)?
            .set_default("idle_timeout_secs", 600)?
            .set_default("busy_timeout_ms", 5000)?
            .set_default("run_migrations", true)?
            .set_default("log_filter", "info,till=debug,sqlx=warn")?
            .add_source(config::File::with_name(name).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue("min_connections".to_string()));
        }
        Ok(())
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn into_db_config(self) -> DbConfig {
        if self.database_path == ":memory:" {
            return DbConfig::in_memory().run_migrations(self.run_migrations);
        }

        DbConfig::new(self.database_path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .run_migrations(self.run_migrations)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = TillConfig::load_from("does-not-exist/till-test").unwrap();

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.run_migrations);

        let db = config.into_db_config();
        assert_eq!(db.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_in_memory_path_maps_to_single_connection() {
        let config = TillConfig {
            database_path: ":memory:".to_string(),
            max_connections: 8,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            busy_timeout_ms: 5000,
            run_migrations: true,
            log_filter: "info".to_string(),
        };

        assert_eq!(config.into_db_config().max_connections, 1);
    }

    #[test]
    fn test_validation() {
        let mut config = TillConfig::load_from("does-not-exist/till-test").unwrap();
        config.min_connections = config.max_connections + 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
