//! SmallChat Domain Library
//!
//! Core domain types and interfaces for the SmallChat service.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (ChatMessage)
//!   - `value_objects/`: Immutable value types (MessageType)
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: Durable message storage
//!
//! # Usage
//!
//! ```rust,ignore
//! use smallchat::{ChatMessage, MessageRepository, MessageType};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{ChatMessage, DomainError, MessageType};
pub use ports::MessageRepository;
