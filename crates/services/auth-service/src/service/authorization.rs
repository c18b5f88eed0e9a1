//! Role checks over validated claims.

use common::{AppError, AppResult};
use domain::UserRole;

use super::token_service::Claims;

/// Callers whose role covers `required` pass.
pub fn require_role(claims: &Claims, required: UserRole) -> AppResult<()> {
    if claims.role.can_access(&required) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Only administrators pass.
pub fn require_admin(claims: &Claims) -> AppResult<()> {
    require_role(claims, UserRole::Admin)
}

/// The subject itself or an administrator passes.
pub fn require_self_or_admin(claims: &Claims, subject_id: &str) -> AppResult<()> {
    if claims.sub == subject_id || require_admin(claims).is_ok() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: UserRole) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "user@example.com".to_string(),
            role,
            iss: "TheLoadingBean".to_string(),
            aud: "TheLoadingBean".to_string(),
            iat: 0,
            exp: 60,
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&claims("1", UserRole::Admin)).is_ok());
        assert!(matches!(
            require_admin(&claims("1", UserRole::Customer)),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_require_role() {
        let customer = claims("1", UserRole::Customer);
        assert!(require_role(&customer, UserRole::Customer).is_ok());
        assert!(require_role(&customer, UserRole::Admin).is_err());
        assert!(require_role(&claims("1", UserRole::Admin), UserRole::Customer).is_ok());
    }

    #[test]
    fn test_require_self_or_admin() {
        assert!(require_self_or_admin(&claims("1", UserRole::Customer), "1").is_ok());
        assert!(require_self_or_admin(&claims("9", UserRole::Admin), "1").is_ok());
        assert!(matches!(
            require_self_or_admin(&claims("2", UserRole::Customer), "1"),
            Err(AppError::Forbidden)
        ));
    }
}
