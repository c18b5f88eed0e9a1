//! Infrastructure layer - document store backends.

mod memory;
mod mongo;
mod store;

pub use memory::{MemorySession, MemoryStore};
pub use mongo::{MongoSession, MongoStore};
pub use store::{DocumentStore, Filter, StoreSession};
