//! Order queries.

use common::AppResult;
use domain::constants::COLLECTION_ORDERS;
use domain::Order;

use super::base::{Entity, Repository};
use crate::infra::{DocumentStore, Filter};

impl Entity for Order {
    const COLLECTION: &'static str = COLLECTION_ORDERS;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}

impl<S: DocumentStore> Repository<Order, S> {
    /// All orders placed by one customer
    pub async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Vec<Order>> {
        self.find(Filter::eq("CustomerId", customer_id)).await
    }
}
