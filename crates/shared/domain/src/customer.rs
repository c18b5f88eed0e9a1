//! Customer entity, the credential record behind every login.

use serde::{Deserialize, Serialize};

use crate::constants::{ROLE_ADMIN, ROLE_CUSTOMER};
use crate::error::DomainError;

/// User roles enumeration.
///
/// Serialized exactly as `"Customer"` / `"Admin"`; any other value fails to
/// deserialize, which is what rejects tokens carrying a forged role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Check if this role can access a required role
    pub fn can_access(&self, required: &UserRole) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Customer => matches!(required, UserRole::Customer),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::Customer => ROLE_CUSTOMER,
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = DomainError;

    /// Case-insensitive so that CLI input like `admin` works.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(ROLE_ADMIN) {
            Ok(UserRole::Admin)
        } else if s.eq_ignore_ascii_case(ROLE_CUSTOMER) {
            Ok(UserRole::Customer)
        } else {
            Err(DomainError::UnknownRole(s.to_string()))
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer domain entity.
///
/// Stored with PascalCase field names; `id` is the document `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Customer {
    /// Build an unsaved customer; the store assigns the id on create.
    pub fn new(request: CreateCustomer, password_hash: String, is_admin: bool) -> Self {
        Self {
            id: String::new(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            address: request.address,
            password_hash,
            is_admin,
        }
    }

    /// Role derived from the stored admin flag
    pub fn role(&self) -> UserRole {
        if self.is_admin {
            UserRole::Admin
        } else {
            UserRole::Customer
        }
    }
}

/// Registration data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCustomer {
    pub email: String,
    /// Plain text password (minimum 6 characters)
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

/// Customer response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub role: UserRole,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        let role = customer.role();
        Self {
            id: customer.id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: customer.phone,
            address: customer.address,
            role,
        }
    }
}
