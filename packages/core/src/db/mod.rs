//! Store Layer
//!
//! This module defines the persistence abstraction the engine consumes:
//!
//! - `MapStore` - async read access plus the transaction entry point
//! - `StoreTx` - the synchronous transactional view mutations run against
//! - `MemoryStore` - the in-memory backend shipped with the crate
//!
//! The engine never talks to a concrete database; any backend that honors
//! the coordinate-uniqueness backstop can implement `MapStore`.

mod error;
mod memory_store;
mod node_store;

pub use error::StoreError;
pub use memory_store::MemoryStore;
pub use node_store::{MapStore, StoreTx};
