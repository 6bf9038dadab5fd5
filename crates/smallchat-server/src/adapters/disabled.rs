//! Disabled durable store
//!
//! Used when persistence is switched off: nothing is written, nothing is
//! ever loaded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use smallchat::{ChatMessage, DomainError, MessageRepository};

/// No-op implementation of MessageRepository
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMessageRepository;

impl DisabledMessageRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageRepository for DisabledMessageRepository {
    async fn save(&self, _message: &ChatMessage) -> Result<(), DomainError> {
        Ok(())
    }

    async fn load_since(&self, _cutoff: DateTime<Utc>) -> Result<Vec<ChatMessage>, DomainError> {
        Ok(Vec::new())
    }

    async fn delete_before(&self, _cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        Ok(0)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
