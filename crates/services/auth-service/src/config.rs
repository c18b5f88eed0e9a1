//! Auth service configuration.

use std::env;

use common::{AppError, AppResult, JwtConfig};

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub jwt: JwtConfig,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// `JWT_SECRET` must be set and at least 32 bytes long;
    /// `JWT_EXPIRATION_MINUTES`, when set, must be a non-negative integer.
    pub fn from_env() -> AppResult<Self> {
        let defaults = JwtConfig::default();

        let secret = env::var("JWT_SECRET").map_err(|_| {
            AppError::configuration("JWT_SECRET must be set (minimum 32 characters)")
        })?;
        let expiration_minutes = match env::var("JWT_EXPIRATION_MINUTES") {
            Ok(value) => value.parse().map_err(|_| {
                AppError::configuration(format!("invalid JWT_EXPIRATION_MINUTES '{}'", value))
            })?,
            Err(_) => defaults.expiration_minutes,
        };

        let config = Self {
            jwt: JwtConfig {
                secret,
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
                audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
                expiration_minutes,
            },
        };
        config.jwt.validate()?;
        Ok(config)
    }
}
