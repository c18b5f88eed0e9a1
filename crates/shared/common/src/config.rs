//! Shared configuration structures.

use std::str::FromStr;

use domain::constants::{
    DEFAULT_TOKEN_EXPIRATION_MINUTES, DEFAULT_TOKEN_ISSUER, MAX_TOKEN_EXPIRATION_MINUTES,
    MIN_JWT_SECRET_LENGTH,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Which document store backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::configuration(format!(
                "unknown store backend '{}'",
                other
            ))),
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongo,
            url: "mongodb://localhost:27017".to_string(),
            database: DEFAULT_TOKEN_ISSUER.to_string(),
        }
    }
}

/// JWT configuration for authentication.
#[derive(Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_minutes: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Reject keys too short for HS256 and validity windows outside
    /// `0..=MAX_TOKEN_EXPIRATION_MINUTES`.
    pub fn validate(&self) -> AppResult<()> {
        if self.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::configuration(format!(
                "JWT secret must be at least {} bytes",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if self.expiration_minutes < 0 {
            return Err(AppError::configuration(
                "JWT expiration must not be negative",
            ));
        }
        if self.expiration_minutes > MAX_TOKEN_EXPIRATION_MINUTES {
            return Err(AppError::configuration(format!(
                "JWT expiration must not exceed {} minutes",
                MAX_TOKEN_EXPIRATION_MINUTES
            )));
        }
        Ok(())
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            audience: DEFAULT_TOKEN_ISSUER.to_string(),
            expiration_minutes: DEFAULT_TOKEN_EXPIRATION_MINUTES,
        }
    }
}

// Don't expose the signing key in debug output
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}
