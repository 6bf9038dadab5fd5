//! SmallChat API Models
//!
//! Request/response DTOs for the HTTP API.

mod message;

pub use message::*;
