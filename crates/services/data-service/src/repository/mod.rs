//! Repository layer for data access.
//!
//! One generic [`Repository`] per entity type, bound to the session slot of
//! the unit of work that created it. Entity-specific queries live in the
//! per-entity modules.

mod base;
mod customer_repository;
mod order_repository;
mod product_repository;

pub use base::{Entity, Repository, SessionSlot};
