//! Domain layer - Storefront entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Customers, orders and products are shared by the data and auth services.

pub mod constants;
pub mod customer;
pub mod error;
pub mod order;
pub mod password;
pub mod product;

pub use constants::*;
pub use customer::{CreateCustomer, Customer, CustomerResponse, UserRole};
pub use error::{DomainError, DomainResult};
pub use order::{Order, OrderItem, OrderStatus};
pub use password::Password;
pub use product::Product;
