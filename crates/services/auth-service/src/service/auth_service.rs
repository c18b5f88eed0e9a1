//! Authentication service - Handles customer registration and login.
//!
//! Uses the domain Password value object for hashing and the token service
//! for issuing bearer tokens.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::client::CredentialStore;
use common::{AppError, AppResult, OptionExt};
use domain::{CreateCustomer, Customer, CustomerResponse, Password};

use super::authorization::{require_admin, require_self_or_admin};
use super::token_service::{Claims, TokenResponse, TokenService};

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new customer and return a token for it
    async fn register(&self, request: CreateCustomer) -> AppResult<TokenResponse>;

    /// Register a new administrator; the caller must be an administrator
    async fn register_admin(
        &self,
        caller: &Claims,
        request: CreateCustomer,
    ) -> AppResult<TokenResponse>;

    /// Login and return JWT token
    async fn login(&self, email: &str, password: &str) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Stored profile of `customer_id`, visible to that customer and to
    /// administrators
    async fn profile(&self, caller: &Claims, customer_id: &str) -> AppResult<CustomerResponse>;
}

/// Concrete implementation of AuthService over a credential store.
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    tokens: TokenService,
}

impl Authenticator {
    /// Create new auth service instance
    pub fn new(credentials: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    async fn create_customer(
        &self,
        request: CreateCustomer,
        is_admin: bool,
    ) -> AppResult<TokenResponse> {
        let email = request.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::validation("A valid email address is required"));
        }

        if self.credentials.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email"));
        }

        let password_hash = Password::new(&request.password)?.into_string();

        let customer = Customer::new(
            CreateCustomer {
                email,
                ..request
            },
            password_hash,
            is_admin,
        );
        // A concurrent registration can still win between lookup and insert;
        // the unique index turns that into a conflict here.
        let customer = self
            .credentials
            .insert(customer)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::conflict("Email"),
                other => other,
            })?;
        info!(customer_id = %customer.id, role = %customer.role(), "customer registered");

        self.tokens
            .issue_token(&customer.id, &customer.email, customer.role())
    }
}

/// Hash verified when the email is unknown, so both failure paths cost the
/// same argon2 work.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        Password::new("not-a-real-password")
            .map(Password::into_string)
            .unwrap_or_default()
    })
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, request: CreateCustomer) -> AppResult<TokenResponse> {
        self.create_customer(request, false).await
    }

    async fn register_admin(
        &self,
        caller: &Claims,
        request: CreateCustomer,
    ) -> AppResult<TokenResponse> {
        if let Err(e) = require_admin(caller) {
            warn!(caller = %caller.sub, "non-admin attempted admin registration");
            return Err(e);
        }
        self.create_customer(request, true).await
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<TokenResponse> {
        let customer = self.credentials.find_by_email(email.trim()).await?;

        // SECURITY: Perform password verification even if the customer doesn't
        // exist to prevent timing attacks that could enumerate valid emails.
        let password_hash = match &customer {
            Some(c) => c.password_hash.as_str(),
            None => dummy_hash(),
        };
        let password_valid = Password::from_hash(password_hash).verify(password);

        match customer {
            Some(customer) if password_valid => {
                self.tokens
                    .issue_token(&customer.id, &customer.email, customer.role())
            }
            _ => Err(AppError::InvalidLogin),
        }
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        Ok(self.tokens.validate_token(token)?)
    }

    async fn profile(&self, caller: &Claims, customer_id: &str) -> AppResult<CustomerResponse> {
        require_self_or_admin(caller, customer_id)?;
        let customer = self
            .credentials
            .find_by_id(customer_id)
            .await?
            .ok_or_not_found()?;
        Ok(customer.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCredentialStore;
    use common::JwtConfig;
    use domain::UserRole;
    use mockall::predicate::eq;

    const SECRET: &str = "a-test-signing-key-that-is-long-enough";

    fn token_service() -> TokenService {
        TokenService::new(&JwtConfig::new(SECRET)).unwrap()
    }

    fn registration(email: &str, password: &str) -> CreateCustomer {
        CreateCustomer {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Analytical Way".to_string(),
        }
    }

    fn stored_customer(email: &str, password: &str, is_admin: bool) -> Customer {
        let hash = Password::new(password).unwrap().into_string();
        let mut customer = Customer::new(registration(email, password), hash, is_admin);
        customer.id = "65f0a1b2c3d4e5f6a7b8c9d0".to_string();
        customer
    }

    fn admin_claims(service: &Authenticator) -> Claims {
        let token = service
            .tokens()
            .issue_token("admin-1", "root@example.com", UserRole::Admin)
            .unwrap()
            .access_token;
        service.verify_token(&token).unwrap()
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .with(eq("ada@example.com"))
            .returning(|_| Ok(None));
        store
            .expect_insert()
            .withf(|c| !c.is_admin && c.password_hash.starts_with("$argon2"))
            .returning(|mut c| {
                c.id = "new-id".to_string();
                Ok(c)
            });

        let service = Authenticator::new(Arc::new(store), token_service());
        let response = service
            .register(registration(" ada@example.com ", "Password123"))
            .await
            .unwrap();

        assert!(!response.is_admin);
        assert_eq!(response.email, "ada@example.com");
        let claims = service.verify_token(&response.access_token).unwrap();
        assert_eq!(claims.sub, "new-id");
        assert_eq!(claims.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_customer(email, "Password123", false))));
        store.expect_insert().never();

        let service = Authenticator::new(Arc::new(store), token_service());
        let result = service
            .register(registration("ada@example.com", "Password123"))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_insert_conflict_reports_email() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));
        store
            .expect_insert()
            .returning(|_| Err(AppError::conflict("Document")));

        let service = Authenticator::new(Arc::new(store), token_service());
        let result = service
            .register(registration("ada@example.com", "Password123"))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(field)) if field == "Email"));
    }

    #[tokio::test]
    async fn test_register_short_password() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));
        store.expect_insert().never();

        let service = Authenticator::new(Arc::new(store), token_service());
        let result = service.register(registration("ada@example.com", "12345")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_invalid_email() {
        let store = MockCredentialStore::new();
        let service = Authenticator::new(Arc::new(store), token_service());

        let result = service.register(registration("   ", "Password123")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_admin_requires_admin_caller() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().never();
        store.expect_insert().never();

        let service = Authenticator::new(Arc::new(store), token_service());
        let token = service
            .tokens()
            .issue_token("c-1", "shopper@example.com", UserRole::Customer)
            .unwrap()
            .access_token;
        let caller = service.verify_token(&token).unwrap();

        let result = service
            .register_admin(&caller, registration("boss@example.com", "Password123"))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_register_admin_success() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));
        store
            .expect_insert()
            .withf(|c| c.is_admin)
            .returning(|mut c| {
                c.id = "admin-2".to_string();
                Ok(c)
            });

        let service = Authenticator::new(Arc::new(store), token_service());
        let caller = admin_claims(&service);
        let response = service
            .register_admin(&caller, registration("boss@example.com", "Password123"))
            .await
            .unwrap();

        assert!(response.is_admin);
        assert!(service.tokens().is_admin_from_token(&response.access_token));
    }

    #[tokio::test]
    async fn test_login_success_uses_stored_role() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .with(eq("root@example.com"))
            .returning(|email| Ok(Some(stored_customer(email, "Password123", true))));

        let service = Authenticator::new(Arc::new(store), token_service());
        let response = service.login("root@example.com", "Password123").await.unwrap();

        let claims = service.verify_token(&response.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.sub, "65f0a1b2c3d4e5f6a7b8c9d0");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_customer(email, "Password123", false))));

        let service = Authenticator::new(Arc::new(store), token_service());
        let result = service.login("ada@example.com", "WrongPassword").await;

        assert!(matches!(result, Err(AppError::InvalidLogin)));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));

        let service = Authenticator::new(Arc::new(store), token_service());
        let result = service.login("ghost@example.com", "Password123").await;

        assert!(matches!(result, Err(AppError::InvalidLogin)));
    }

    #[tokio::test]
    async fn test_login_store_failure_propagates() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(|_| Err(AppError::store_unavailable("no primary")));

        let service = Authenticator::new(Arc::new(store), token_service());
        let result = service.login("ada@example.com", "Password123").await;

        assert!(matches!(result, Err(e) if e.is_transient()));
    }

    #[tokio::test]
    async fn test_profile_of_self() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_id()
            .with(eq("65f0a1b2c3d4e5f6a7b8c9d0"))
            .returning(|_| Ok(Some(stored_customer("ada@example.com", "Password123", false))));

        let service = Authenticator::new(Arc::new(store), token_service());
        let token = service
            .tokens()
            .issue_token("65f0a1b2c3d4e5f6a7b8c9d0", "ada@example.com", UserRole::Customer)
            .unwrap()
            .access_token;
        let caller = service.verify_token(&token).unwrap();

        let profile = service
            .profile(&caller, "65f0a1b2c3d4e5f6a7b8c9d0")
            .await
            .unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn test_profile_of_someone_else_is_forbidden() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_id().never();

        let service = Authenticator::new(Arc::new(store), token_service());
        let token = service
            .tokens()
            .issue_token("c-1", "ada@example.com", UserRole::Customer)
            .unwrap()
            .access_token;
        let caller = service.verify_token(&token).unwrap();

        let result = service.profile(&caller, "c-2").await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_profile_missing_customer() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_id().returning(|_| Ok(None));

        let service = Authenticator::new(Arc::new(store), token_service());
        let caller = admin_claims(&service);

        let result = service.profile(&caller, "gone").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[test]
    fn test_verify_token_rejects_garbage() {
        let service = Authenticator::new(Arc::new(MockCredentialStore::new()), token_service());
        assert!(matches!(
            service.verify_token("garbage"),
            Err(AppError::InvalidCredential)
        ));
    }
}
