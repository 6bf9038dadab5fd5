//! MessageType - Semantic kind of a chat event

use serde::{Deserialize, Serialize};

/// Chat event classification
///
/// `Join` and `Leave` are synthesized by the transport layer when a user
/// enters or leaves; only `Chat` originates from user input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Chat,
    Join,
    Leave,
}

impl MessageType {
    /// JOIN/LEAVE events are system messages
    pub fn is_system(&self) -> bool {
        matches!(self, MessageType::Join | MessageType::Leave)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Chat => "CHAT",
            MessageType::Join => "JOIN",
            MessageType::Leave => "LEAVE",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CHAT" => Ok(MessageType::Chat),
            "JOIN" => Ok(MessageType::Join),
            "LEAVE" => Ok(MessageType::Leave),
            _ => Err(format!("Invalid message type '{}'. Allowed: CHAT|JOIN|LEAVE", s)),
        }
    }
}
