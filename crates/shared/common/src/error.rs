//! Unified application error handling.
//!
//! A single error type shared by the data and auth services and rendered by
//! the CLI. Internal details are logged, never shown to the caller.

use domain::DomainError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    /// Unknown email or wrong password, deliberately indistinguishable
    #[error("Invalid email or password")]
    InvalidLogin,

    /// Malformed, tampered, expired or foreign token
    #[error("Invalid or expired token")]
    InvalidCredential,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    // Unit of work misuse
    #[error("No transaction in progress")]
    NoTransactionInProgress,

    #[error("A transaction is already in progress")]
    AlreadyInTransaction,

    // Store
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[cfg(feature = "database")]
    #[error("Store error")]
    Store(#[source] mongodb::error::Error),

    #[cfg(feature = "jwt")]
    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidLogin => "INVALID_LOGIN",
            AppError::InvalidCredential => "INVALID_CREDENTIAL",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NoTransactionInProgress => "NO_TRANSACTION",
            AppError::AlreadyInTransaction => "ALREADY_IN_TRANSACTION",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            #[cfg(feature = "database")]
            AppError::Store(_) => "STORE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Conflict(msg) => {
                if msg.ends_with("already exists") {
                    msg.clone()
                } else {
                    format!("{} already exists", msg)
                }
            }
            AppError::Configuration(msg) => format!("Configuration error: {}", msg),

            // Hide details for internal/security errors
            #[cfg(feature = "database")]
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                "A storage error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "Could not issue token".to_string()
            }
            AppError::StoreUnavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                "The store is temporarily unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }

    /// Programming errors in unit-of-work usage, not runtime conditions
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            AppError::NoTransactionInProgress | AppError::AlreadyInTransaction
        )
    }

    /// Worth retrying the whole unit of work
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

// =============================================================================
// Store Error Conversion
// =============================================================================

#[cfg(feature = "database")]
impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};

        const DUPLICATE_KEY: i32 = 11000;

        let duplicate = match &*err.kind {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                write_error.code == DUPLICATE_KEY
            }
            ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
            _ => false,
        };
        if duplicate {
            return AppError::conflict("Document");
        }

        let transient = err.contains_label(TRANSIENT_TRANSACTION_ERROR)
            || matches!(
                *err.kind,
                ErrorKind::Io(_) | ErrorKind::ServerSelection { .. }
            );
        if transient {
            AppError::StoreUnavailable(err.to_string())
        } else {
            AppError::Store(err)
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Password(msg) => AppError::Validation(msg),
            DomainError::UnknownRole(role) => {
                AppError::BadRequest(format!("unknown role '{}'", role))
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn store_unavailable(detail: impl Into<String>) -> Self {
        AppError::StoreUnavailable(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defect_and_transient_flags() {
        assert!(AppError::NoTransactionInProgress.is_defect());
        assert!(AppError::AlreadyInTransaction.is_defect());
        assert!(!AppError::NotFound.is_defect());
        assert!(AppError::store_unavailable("timeout").is_transient());
        assert!(!AppError::Forbidden.is_transient());
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = AppError::internal("connection string mongodb://secret@host");
        assert_eq!(err.user_message(), "An internal error occurred");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_conflict_message_not_duplicated() {
        assert_eq!(
            AppError::conflict("Email").user_message(),
            "Email already exists"
        );
        assert_eq!(
            AppError::conflict("Email already exists").user_message(),
            "Email already exists"
        );
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: AppError = DomainError::password("too short").into();
        assert!(matches!(err, AppError::Validation(msg) if msg == "too short"));

        let err: AppError = DomainError::UnknownRole("root".into()).into();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn test_option_ext() {
        let missing: Option<u8> = None;
        assert!(matches!(missing.ok_or_not_found(), Err(AppError::NotFound)));
        assert_eq!(Some(3).ok_or_not_found().unwrap(), 3);
    }
}
