//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables prefixed with
//! `CONVO__`. Nested keys use `__` as separator, e.g.
//! `CONVO__DATABASE__HOST=db.internal`.
//!
//! See [`DatabaseConfig`] for the MySQL connection settings.

use convo_data_access::DatabaseConfig;
use serde::Deserialize;

/// Environment variable prefix.
const ENV_PREFIX: &str = "CONVO";

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Name of the data-access backend handed out by the service factory.
    #[serde(default = "default_data_service")]
    pub data_service: String,

    /// MySQL connection configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Listing configuration.
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Pagination limits for conversation listings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the request gives none.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Largest page size a request may ask for.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_data_service() -> String {
    "mysql".to_string()
}

fn default_limit() -> u64 {
    10
}

fn default_max_limit() -> u64 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            data_service: default_data_service(),
            database: DatabaseConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed, or if
    /// the pagination limits are inconsistent.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.pagination.validate()?;
        Ok(config)
    }
}

impl PaginationConfig {
    /// Checks that the default page size is usable under the maximum.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` if either limit is zero or the default
    /// exceeds the maximum.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.max_limit == 0 {
            return Err(config::ConfigError::Message(
                "pagination.max_limit must be at least 1".to_string(),
            ));
        }
        if self.default_limit == 0 {
            return Err(config::ConfigError::Message(
                "pagination.default_limit must be at least 1".to_string(),
            ));
        }
        if self.default_limit > self.max_limit {
            return Err(config::ConfigError::Message(format!(
                "pagination.default_limit ({}) exceeds pagination.max_limit ({})",
                self.default_limit, self.max_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn try_load(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_environment(
            config::Environment::with_prefix(ENV_PREFIX).source(Some(source)),
        )
    }

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        try_load(vars).expect("load config")
    }

    #[test]
    fn pagination_config_has_correct_defaults() {
        let config = PaginationConfig::default();
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.max_limit, 100);
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.data_service, "mysql");
        assert_eq!(config.database.port, 3306);
    }

    #[test]
    fn nested_variables_override_defaults() {
        let config = load(&[
            ("CONVO__DATA_SERVICE", "memory"),
            ("CONVO__DATABASE__HOST", "db.internal"),
            ("CONVO__DATABASE__PORT", "3307"),
            ("CONVO__PAGINATION__MAX_LIMIT", "50"),
        ]);
        assert_eq!(config.data_service, "memory");
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.pagination.max_limit, 50);
        assert_eq!(config.pagination.default_limit, 10);
    }

    #[test]
    fn max_limit_below_default_limit_is_rejected() {
        let err = try_load(&[("CONVO__PAGINATION__MAX_LIMIT", "5")]).unwrap_err();
        assert!(
            err.to_string()
                .contains("pagination.default_limit (10) exceeds pagination.max_limit (5)")
        );

        let config = load(&[
            ("CONVO__PAGINATION__MAX_LIMIT", "5"),
            ("CONVO__PAGINATION__DEFAULT_LIMIT", "5"),
        ]);
        assert_eq!(config.pagination.default_limit, 5);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = try_load(&[("CONVO__PAGINATION__DEFAULT_LIMIT", "0")]).unwrap_err();
        assert!(err.to_string().contains("default_limit must be at least 1"));

        let err = try_load(&[
            ("CONVO__PAGINATION__DEFAULT_LIMIT", "0"),
            ("CONVO__PAGINATION__MAX_LIMIT", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("max_limit must be at least 1"));
    }
}
