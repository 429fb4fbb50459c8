//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod logging;
pub mod text;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use self::database::{DatabaseConfig, IsolationLevel};
pub use self::logging::LoggingConfig;
pub use self::text::TextConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (`default.toml` + environment overlay) and
/// `CATALOG__`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Text comparison and search settings.
    #[serde(default)]
    pub text: TextConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `{dir}/default.toml`, `{dir}/{env}.toml`,
    /// and the environment.
    ///
    /// Both files are optional; `CATALOG__DATABASE__URL` style variables
    /// override values from either file.
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        debug!(dir, env, "Loading configuration");

        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CATALOG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://catalog@localhost/catalog" }
        }))
        .expect("deserialize");

        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.isolation, IsolationLevel::RepeatableRead);
        assert_eq!(config.text.collation.as_deref(), Some("tr-TR-x-icu"));
        assert!(config.text.case_insensitive);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_database_section_is_rejected() {
        let result = serde_json::from_value::<AppConfig>(serde_json::json!({}));
        assert!(result.is_err());
    }
}
