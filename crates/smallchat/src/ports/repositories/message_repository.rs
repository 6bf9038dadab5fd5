//! Message Repository Port
//!
//! Durable backing store for chat history. It exists for crash recovery
//! only; live reads are always served from memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{errors::DomainError, ChatMessage};

/// Repository interface for ChatMessage entities
///
/// Rows are keyed by a partition plus a time-ordered row key, so range
/// queries by timestamp stay cheap.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert or replace a message (idempotent)
    async fn save(&self, message: &ChatMessage) -> Result<(), DomainError>;

    /// All messages with `timestamp >= cutoff`, in no particular order
    async fn load_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ChatMessage>, DomainError>;

    /// Delete messages with `timestamp < cutoff`
    ///
    /// Best-effort: returns the number of confirmed deletions. Rows that
    /// fail to delete are left for the next call.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Whether this repository actually persists anything.
    /// Fixed for the lifetime of the repository.
    fn is_enabled(&self) -> bool;
}
