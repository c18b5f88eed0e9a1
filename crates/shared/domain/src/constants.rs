//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Role carried by every registered shopper
pub const ROLE_CUSTOMER: &str = "Customer";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "Admin";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Authentication
// =============================================================================

/// Default token validity window in minutes
pub const DEFAULT_TOKEN_EXPIRATION_MINUTES: i64 = 60;

/// Longest configurable validity window: one year
pub const MAX_TOKEN_EXPIRATION_MINUTES: i64 = 365 * 24 * 60;

/// Minimum signing key length in bytes (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Default `iss` and `aud` value for issued tokens
pub const DEFAULT_TOKEN_ISSUER: &str = "TheLoadingBean";

// =============================================================================
// Collections
// =============================================================================

pub const COLLECTION_CUSTOMERS: &str = "Customers";
pub const COLLECTION_ORDERS: &str = "Orders";
pub const COLLECTION_PRODUCTS: &str = "Products";
