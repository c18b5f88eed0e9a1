//! Token service - issues and validates signed bearer tokens.
//!
//! Tokens are compact JWS strings signed with HS256. Signature, algorithm,
//! issuer and audience are checked by `jsonwebtoken`; the time window
//! `iat <= now < exp` is checked here against the injected [`Clock`], so
//! issuance and validation share one time source.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use common::{AppError, AppResult, JwtConfig};
use domain::{UserRole, TOKEN_TYPE_BEARER};

use super::clock::{Clock, SystemClock};

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Token response returned after successful authentication
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    /// JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub email: String,
    pub is_admin: bool,
}

/// Token rejected.
///
/// Malformed encoding, bad signature, wrong issuer or audience and expiry
/// all collapse into this one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid or expired token")]
pub struct InvalidCredential;

impl From<InvalidCredential> for AppError {
    fn from(_: InvalidCredential) -> Self {
        AppError::InvalidCredential
    }
}

/// Issues and validates tokens with a key fixed at construction.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    issuer: String,
    audience: String,
    validity: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service on the system clock.
    ///
    /// # Errors
    /// Configuration error when the key is shorter than 32 bytes.
    pub fn new(config: &JwtConfig) -> AppResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &JwtConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        config.validate()?;
        let validity = Duration::try_minutes(config.expiration_minutes)
            .ok_or_else(|| AppError::configuration("JWT expiration is out of range"))?;

        let secret = config.secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(validation),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            validity,
            clock,
        })
    }

    /// Issue a token valid for the configured window.
    pub fn issue_token(&self, subject: &str, email: &str, role: UserRole) -> AppResult<TokenResponse> {
        self.issue_token_valid_for(subject, email, role, self.validity)
    }

    /// Issue a token valid for `validity`. A zero window yields a token that
    /// is already expired.
    pub fn issue_token_valid_for(
        &self,
        subject: &str,
        email: &str,
        role: UserRole,
        validity: Duration,
    ) -> AppResult<TokenResponse> {
        if validity < Duration::zero() {
            return Err(AppError::validation("token validity must not be negative"));
        }

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(validity)
            .ok_or_else(|| AppError::validation("token validity is too long"))?;
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        debug!(sub = %subject, role = %role, "token issued");

        Ok(TokenResponse {
            access_token: token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: validity.num_seconds(),
            expires_at,
            email: email.to_string(),
            is_admin: role.is_admin(),
        })
    }

    /// Validate a token and return its claims.
    ///
    /// The reason for a rejection is only logged at debug level.
    pub fn validate_token(&self, token: &str) -> Result<Claims, InvalidCredential> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(reason = %e, "token rejected");
                InvalidCredential
            })?
            .claims;

        let now = self.clock.now().timestamp();
        if now < claims.iat {
            debug!(sub = %claims.sub, "token rejected: issued in the future");
            return Err(InvalidCredential);
        }
        if now >= claims.exp {
            debug!(sub = %claims.sub, "token rejected: expired");
            return Err(InvalidCredential);
        }
        Ok(claims)
    }

    /// Named claim of a valid token; `None` for unknown claims or invalid tokens.
    pub fn extract_claim(&self, token: &str, key: &str) -> Option<serde_json::Value> {
        let claims = self.validate_token(token).ok()?;
        let value = serde_json::to_value(claims).ok()?;
        value.get(key).cloned()
    }

    pub fn user_id_from_token(&self, token: &str) -> Option<String> {
        self.validate_token(token).ok().map(|claims| claims.sub)
    }

    /// False for invalid tokens.
    pub fn is_admin_from_token(&self, token: &str) -> bool {
        self.validate_token(token)
            .map(|claims| claims.is_admin())
            .unwrap_or(false)
    }
}
