//! Message DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use smallchat::{ChatMessage, DomainError, MessageType};

/// Upper bound for `limit` on the recent-messages endpoint
pub const MAX_RECENT_LIMIT: usize = 200;
/// Default for `limit` on the recent-messages endpoint
pub const DEFAULT_RECENT_LIMIT: i64 = 50;
/// Upper bound for `size` on the paged endpoint
pub const MAX_PAGE_SIZE: i64 = 1000;

/// A stored chat message, as sent to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub sender: String,
    pub content: String,
    /// CHAT, JOIN or LEAVE
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_content: Option<String>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            sender: message.sender,
            content: message.content,
            message_type: message.message_type.to_string(),
            timestamp: message.timestamp,
            reply_to_id: message.reply_to_id,
            reply_to_sender: message.reply_to_sender,
            reply_to_content: message.reply_to_content,
        }
    }
}

/// Post a message through the API
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    /// Display name of the sender (required)
    pub sender: Option<String>,
    /// Message body (required, may be empty)
    pub content: Option<String>,
    /// CHAT (default), JOIN or LEAVE
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub reply_to_id: Option<String>,
    pub reply_to_sender: Option<String>,
    pub reply_to_content: Option<String>,
}

impl PostMessageRequest {
    /// Validate the request and build the message to store
    pub fn into_message(self) -> Result<ChatMessage, DomainError> {
        let sender = self
            .sender
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomainError::validation("'sender' is required"))?;

        let content = self
            .content
            .ok_or_else(|| DomainError::validation("'content' is required"))?;

        let message_type = match self.message_type {
            Some(raw) => raw.parse::<MessageType>().map_err(DomainError::Validation)?,
            None => MessageType::Chat,
        };

        let message = ChatMessage::new(sender, content, message_type);
        Ok(match self.reply_to_id {
            Some(reply_to_id) => {
                message.with_reply(reply_to_id, self.reply_to_sender, self.reply_to_content)
            }
            None => message,
        })
    }
}

/// Query for listing all messages
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    /// Include JOIN/LEAVE messages (default: true)
    pub include_system: Option<bool>,
}

/// Query for recent messages
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct RecentMessagesQuery {
    /// Number of messages (default: 50, clamped to 1..=200)
    pub limit: Option<i64>,
    /// Include JOIN/LEAVE messages (default: true)
    pub include_system: Option<bool>,
}

impl RecentMessagesQuery {
    pub fn clamped_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT as i64) as usize
    }
}

/// Query for paged listing
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index (default: 0)
    pub page: Option<i64>,
    /// Page size (default: 100, max 1000)
    pub size: Option<i64>,
}

/// One page of messages, oldest first
#[derive(Debug, Serialize, ToSchema)]
pub struct MessagePage {
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub messages: Vec<MessageResponse>,
}

/// Result of a reload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReloadResponse {
    pub loaded: usize,
}

/// Result of a clear
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearResponse {
    pub message: String,
}

/// Chat statistics
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_messages: usize,
    pub retention_days: i64,
    pub persistence_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> PostMessageRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_request_defaults_to_chat() {
        let message = request(serde_json::json!({"sender": " bob ", "content": "hi"}))
            .into_message()
            .unwrap();

        assert_eq!(message.sender, "bob");
        assert_eq!(message.message_type, MessageType::Chat);
        assert!(message.reply_to_id.is_none());
    }

    #[test]
    fn test_request_validation() {
        let missing_sender = request(serde_json::json!({"content": "hi"})).into_message();
        assert!(missing_sender.unwrap_err().to_string().contains("sender"));

        let blank_sender =
            request(serde_json::json!({"sender": "  ", "content": "hi"})).into_message();
        assert!(blank_sender.is_err());

        let missing_content = request(serde_json::json!({"sender": "bob"})).into_message();
        assert!(missing_content.unwrap_err().to_string().contains("content"));

        let bad_type =
            request(serde_json::json!({"sender": "bob", "content": "hi", "type": "SHOUT"}))
                .into_message();
        assert!(bad_type.unwrap_err().is_validation());
    }

    #[test]
    fn test_request_with_reply_and_type() {
        let message = request(serde_json::json!({
            "sender": "bob",
            "content": "",
            "type": "leave",
            "replyToId": "A",
            "replyToSender": "eve"
        }))
        .into_message()
        .unwrap();

        assert_eq!(message.message_type, MessageType::Leave);
        assert_eq!(message.reply_to_id.as_deref(), Some("A"));
        assert_eq!(message.reply_to_sender.as_deref(), Some("eve"));
    }

    #[test]
    fn test_recent_limit_is_clamped() {
        let query = |limit| RecentMessagesQuery {
            limit,
            include_system: None,
        };
        assert_eq!(query(None).clamped_limit(), 50);
        assert_eq!(query(Some(0)).clamped_limit(), 1);
        assert_eq!(query(Some(-5)).clamped_limit(), 1);
        assert_eq!(query(Some(500)).clamped_limit(), 200);
        assert_eq!(query(Some(20)).clamped_limit(), 20);
    }

    #[test]
    fn test_response_matches_domain_json() {
        let message = ChatMessage::join("bob");
        let from_domain = serde_json::to_value(&message).unwrap();
        let from_dto = serde_json::to_value(MessageResponse::from(message)).unwrap();
        assert_eq!(from_domain, from_dto);
    }
}
