//! ChatMessage Entity
//!
//! One chat event. Immutable after creation; the store only ever replaces a
//! message wholesale by `id`.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::value_objects::MessageType;

/// A chat, join or leave event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message ID (de-duplication key)
    #[serde(default = "new_message_id")]
    pub id: String,
    /// Display name of the originator
    pub sender: String,
    /// Message body
    pub content: String,
    /// Semantic kind of the event
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// When the message was created
    #[serde(default = "now_millis")]
    pub timestamp: DateTime<Utc>,
    /// ID of the message being replied to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// Sender of the message being replied to, as it was when replying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_sender: Option<String>,
    /// Content of the message being replied to, as it was when replying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_content: Option<String>,
}

/// Current time at millisecond precision, the resolution of the durable store
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ChatMessage {
    /// Create a new message with generated ID and timestamp
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            id: new_message_id(),
            sender: sender.into(),
            content: content.into(),
            message_type,
            timestamp: now_millis(),
            reply_to_id: None,
            reply_to_sender: None,
            reply_to_content: None,
        }
    }

    /// A user chat message
    pub fn chat(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(sender, content, MessageType::Chat)
    }

    /// Synthetic event announcing that `sender` joined
    pub fn join(sender: impl Into<String>) -> Self {
        let sender = sender.into();
        let content = format!("{} joined the chat!", sender);
        Self::new(sender, content, MessageType::Join)
    }

    /// Synthetic event announcing that `sender` left
    pub fn leave(sender: impl Into<String>) -> Self {
        let sender = sender.into();
        let content = format!("{} left the chat!", sender);
        Self::new(sender, content, MessageType::Leave)
    }

    /// Attach a snapshot of the message being replied to
    pub fn with_reply(
        mut self,
        reply_to_id: impl Into<String>,
        reply_to_sender: Option<String>,
        reply_to_content: Option<String>,
    ) -> Self {
        self.reply_to_id = Some(reply_to_id.into());
        self.reply_to_sender = reply_to_sender;
        self.reply_to_content = reply_to_content;
        self
    }

    /// Set timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// JOIN/LEAVE messages are system messages
    pub fn is_system(&self) -> bool {
        self.message_type.is_system()
    }

    /// Check the fields every stored message must carry
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("message id must not be empty"));
        }
        if self.sender.trim().is_empty() {
            return Err(DomainError::validation("'sender' is required"));
        }
        Ok(())
    }
}
