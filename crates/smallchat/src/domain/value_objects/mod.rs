//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod message_type;

pub use message_type::*;
