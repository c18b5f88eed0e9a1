//! Order entity and its line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// One product line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

/// Order domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    pub total_amount: f64,
}

impl Order {
    /// Create a pending order dated now, with the total computed from the items.
    pub fn new(customer_id: impl Into<String>, items: Vec<OrderItem>) -> Self {
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        Self {
            id: String::new(),
            customer_id: customer_id.into(),
            items,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
            total_amount,
        }
    }

    /// Replace the items and recompute the total
    pub fn set_items(&mut self, items: Vec<OrderItem>) {
        self.total_amount = items.iter().map(OrderItem::line_total).sum();
        self.items = items;
    }

    pub fn belongs_to(&self, customer_id: &str) -> bool {
        self.customer_id == customer_id
    }
}
