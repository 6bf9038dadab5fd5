//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

pub mod disabled;
pub mod postgres;

// Re-exports
pub use disabled::DisabledMessageRepository;
pub use postgres::PgMessageRepository;
