//! Background services
//!
//! - hub: broadcast of saved messages to connected clients
//! - scheduler: periodic retention sweep

pub mod hub;
pub mod scheduler;
