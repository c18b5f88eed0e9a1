//! Data Service Library
//!
//! Document-store access for customers, orders and products. Repositories are
//! handed out by a [`UnitOfWork`], which also owns the optional transaction
//! they share. MongoDB backs production; [`MemoryStore`] mirrors its session
//! semantics for development and tests.

pub mod config;
pub mod infra;
pub mod repository;
pub mod unit_of_work;

pub use config::DataServiceConfig;
pub use infra::{DocumentStore, Filter, MemorySession, MemoryStore, MongoSession, MongoStore, StoreSession};
pub use repository::{Entity, Repository};
pub use unit_of_work::{Persistence, TransactionState, UnitOfWork};
