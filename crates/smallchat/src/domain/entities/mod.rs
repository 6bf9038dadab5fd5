//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - ChatMessage: One chat, join or leave event

mod chat_message;

pub use chat_message::*;
