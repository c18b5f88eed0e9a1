//! Product catalogue queries.

use common::AppResult;
use domain::constants::COLLECTION_PRODUCTS;
use domain::Product;

use super::base::{Entity, Repository};
use crate::infra::{DocumentStore, Filter};

const SEARCH_FIELDS: &[&str] = &["Name", "Description"];

impl Entity for Product {
    const COLLECTION: &'static str = COLLECTION_PRODUCTS;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}

impl<S: DocumentStore> Repository<Product, S> {
    /// Case-insensitive substring search on name or description.
    pub async fn search(&self, term: &str) -> AppResult<Vec<Product>> {
        self.find(Filter::contains_any(SEARCH_FIELDS, term)).await
    }

    /// Products that are not discontinued
    pub async fn get_available(&self) -> AppResult<Vec<Product>> {
        self.find(Filter::eq("IsDiscontinued", false)).await
    }

    pub async fn get_discontinued(&self) -> AppResult<Vec<Product>> {
        self.find(Filter::eq("IsDiscontinued", true)).await
    }
}
