//! Configuration for docstore
//!
//! Centralized configuration with sensible defaults.

use crate::error::{DocstoreError, Result};

/// Page size used when a filter does not supply a positive limit
pub const DEFAULT_LIMIT: i64 = 10;

/// Main configuration for a docstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Connection string for the backing PostgreSQL server
    pub database_url: String,

    /// Max pooled connections to the backing engine
    pub max_connections: u32,

    /// How long to wait for a pooled connection (milliseconds)
    pub connection_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Limit applied to filters with a missing or non-positive limit
    pub default_limit: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://postgres@localhost:5432/postgres".to_string(),
            max_connections: 10,
            connection_timeout_ms: 30_000,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the datastore cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(DocstoreError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.default_limit < 1 {
            return Err(DocstoreError::Config(format!(
                "default_limit must be positive, got {}",
                self.default_limit
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the PostgreSQL connection string
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    /// Set the connection pool size
    pub fn max_connections(mut self, count: u32) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the pool checkout timeout (in milliseconds)
    pub fn connection_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connection_timeout_ms = ms;
        self
    }

    /// Set the page size used when a filter has no limit
    pub fn default_limit(mut self, limit: i64) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
