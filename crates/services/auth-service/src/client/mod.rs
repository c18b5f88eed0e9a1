//! Access to customer credentials.

mod credential_store;

#[cfg(test)]
pub use credential_store::MockCredentialStore;
pub use credential_store::{CredentialStore, CustomerCredentials};
