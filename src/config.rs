//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

use crate::notification_log::DEFAULT_SECTION_SIZE;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Create schema objects on startup if they do not exist
    pub create_tables: bool,

    /// Maintain a snapshot store alongside the event store
    pub snapshotting_enabled: bool,

    /// Notifications per section of the notification log
    pub section_size: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let create_tables = parse_bool(
            &env::var("CREATE_TABLES").unwrap_or_else(|_| "false".to_string()),
        )
        .ok_or(ConfigError::InvalidValue("CREATE_TABLES"))?;

        let snapshotting_enabled = parse_bool(
            &env::var("SNAPSHOTTING_ENABLED").unwrap_or_else(|_| "false".to_string()),
        )
        .ok_or(ConfigError::InvalidValue("SNAPSHOTTING_ENABLED"))?;

        let section_size = env::var("SECTION_SIZE")
            .unwrap_or_else(|_| DEFAULT_SECTION_SIZE.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SECTION_SIZE"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            create_tables,
            snapshotting_enabled,
            section_size,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        for yes in ["1", "true", "YES", "On"] {
            assert_eq!(parse_bool(yes), Some(true), "{yes}");
        }
        for no in ["0", "false", "NO", "off"] {
            assert_eq!(parse_bool(no), Some(false), "{no}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    // Environment access is process-global, so everything runs in one test.
    #[test]
    fn test_from_env_defaults_and_overrides() {
        env::remove_var("DATABASE_URL");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingEnv("DATABASE_URL"))
        ));

        env::set_var("DATABASE_URL", "postgres://localhost/eventledger");
        env::remove_var("DATABASE_MAX_CONNECTIONS");
        env::remove_var("CREATE_TABLES");
        env::remove_var("SNAPSHOTTING_ENABLED");
        env::remove_var("SECTION_SIZE");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_max_connections, 10);
        assert!(!config.create_tables);
        assert!(!config.snapshotting_enabled);
        assert_eq!(config.section_size, DEFAULT_SECTION_SIZE);

        env::set_var("DATABASE_MAX_CONNECTIONS", "3");
        env::set_var("CREATE_TABLES", "yes");
        env::set_var("SNAPSHOTTING_ENABLED", "true");
        env::set_var("SECTION_SIZE", "25");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_max_connections, 3);
        assert!(config.create_tables);
        assert!(config.snapshotting_enabled);
        assert_eq!(config.section_size, 25);

        env::set_var("SECTION_SIZE", "lots");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue("SECTION_SIZE"))
        ));
        env::remove_var("SECTION_SIZE");
    }
}
