//! Credential store over the customers collection.

use async_trait::async_trait;
use tracing::debug;

use common::AppResult;
use data_service_lib::{DocumentStore, Persistence};
use domain::Customer;

#[cfg(test)]
use mockall::automock;

/// Customer lookups and writes needed by the authenticator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Customer>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Customer>>;

    /// Insert a new customer; the store assigns the id.
    async fn insert(&self, customer: Customer) -> AppResult<Customer>;

    /// Replace by id. Returns whether the customer existed.
    async fn replace_by_id(&self, customer: &Customer) -> AppResult<bool>;

    /// Delete by id. Returns whether the customer existed.
    async fn delete_by_id(&self, id: &str) -> AppResult<bool>;
}

/// [`CredentialStore`] backed by the data service, one unit of work per call.
pub struct CustomerCredentials<S: DocumentStore> {
    persistence: Persistence<S>,
}

impl<S: DocumentStore> CustomerCredentials<S> {
    pub fn new(persistence: Persistence<S>) -> Self {
        Self { persistence }
    }
}

#[async_trait]
impl<S: DocumentStore> CredentialStore for CustomerCredentials<S> {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Customer>> {
        let uow = self.persistence.unit_of_work();
        uow.customers().get_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let uow = self.persistence.unit_of_work();
        uow.customers().get_by_email(email).await
    }

    async fn insert(&self, customer: Customer) -> AppResult<Customer> {
        let uow = self.persistence.unit_of_work();
        let created = uow.customers().create(customer).await?;
        debug!(customer_id = %created.id, "customer stored");
        Ok(created)
    }

    async fn replace_by_id(&self, customer: &Customer) -> AppResult<bool> {
        let uow = self.persistence.unit_of_work();
        uow.customers().update(customer).await
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<bool> {
        let uow = self.persistence.unit_of_work();
        uow.customers().delete(id).await
    }
}
