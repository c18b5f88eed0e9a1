//! Data service configuration.

use std::env;

use common::{AppResult, DatabaseConfig, StoreBackend};

/// Data service configuration.
#[derive(Debug, Clone, Default)]
pub struct DataServiceConfig {
    pub database: DatabaseConfig,
}

impl DataServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// An unrecognised `STORE_BACKEND` is a configuration error; everything
    /// else falls back to its default.
    pub fn from_env() -> AppResult<Self> {
        let defaults = DatabaseConfig::default();
        let backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse::<StoreBackend>()?,
            Err(_) => defaults.backend,
        };

        Ok(Self {
            database: DatabaseConfig {
                backend,
                url: env::var("MONGODB_URL").unwrap_or(defaults.url),
                database: env::var("MONGODB_DATABASE").unwrap_or(defaults.database),
            },
        })
    }

    /// Override the backend chosen by the environment.
    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.database.backend = backend;
        self
    }
}
