//! Product catalogue entity.

use serde::{Deserialize, Serialize};

fn default_available() -> bool {
    true
}

/// Product domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub product_number: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub is_discontinued: bool,
}

impl Product {
    /// Create an available, not discontinued product
    pub fn new(
        product_number: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            product_number: product_number.into(),
            name: name.into(),
            description: description.into(),
            price,
            category: category.into(),
            is_available: true,
            is_discontinued: false,
        }
    }

    /// Can this product be put on a new order
    pub fn is_orderable(&self) -> bool {
        self.is_available && !self.is_discontinued
    }

    pub fn discontinue(&mut self) {
        self.is_discontinued = true;
        self.is_available = false;
    }
}
