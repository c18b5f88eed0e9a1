//! Auth Service Library
//!
//! Token issuance and validation, customer registration and login, and the
//! role checks built on validated claims. Customers are read and written
//! through the data service's unit of work.

pub mod client;
pub mod config;
pub mod service;

use std::sync::Arc;

use common::AppResult;
use data_service_lib::{DocumentStore, Persistence};
use tracing::info;

use crate::client::CustomerCredentials;
use crate::config::AuthServiceConfig;
use crate::service::{Authenticator, TokenService};

pub use service::{
    require_admin, require_role, require_self_or_admin, AuthService, Claims, Clock,
    InvalidCredential, SystemClock, TokenResponse,
};

/// Wire an authenticator over the given store, creating the unique email
/// index first.
///
/// # Errors
/// Fails with a configuration error when the signing key is too weak, or
/// with the store's error when the index cannot be created.
pub async fn build_authenticator<S: DocumentStore>(
    config: &AuthServiceConfig,
    persistence: Persistence<S>,
) -> AppResult<Authenticator> {
    let tokens = TokenService::new(&config.jwt)?;
    persistence.ensure_indexes().await?;
    let credentials = Arc::new(CustomerCredentials::new(persistence));
    info!(issuer = %config.jwt.issuer, "Authenticator ready");
    Ok(Authenticator::new(credentials, tokens))
}
