//! Customer queries.

use common::AppResult;
use domain::constants::COLLECTION_CUSTOMERS;
use domain::Customer;

use super::base::{Entity, Repository};
use crate::infra::{DocumentStore, Filter};

impl Entity for Customer {
    const COLLECTION: &'static str = COLLECTION_CUSTOMERS;
    const UNIQUE_FIELDS: &'static [&'static str] = &["Email"];

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}

impl<S: DocumentStore> Repository<Customer, S> {
    /// Find customer by exact email address
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        self.find_one(Filter::eq("Email", email)).await
    }
}
