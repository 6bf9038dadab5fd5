//! Application Layer (Use Cases)
//!
//! Orchestrates domain operations and coordinates between
//! the in-memory store and the durable repository.

mod message_store;
pub mod persistence;

pub use message_store::MessageStore;
pub use persistence::PersistenceConfig;
