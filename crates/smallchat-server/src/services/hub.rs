//! Chat Hub - fan-out of saved messages to every connected client

use tokio::sync::broadcast;

use smallchat::ChatMessage;

/// Buffered events per subscriber before it starts lagging
const HUB_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ChatHub {
    sender: broadcast::Sender<ChatMessage>,
}

impl ChatHub {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(HUB_CAPACITY);
        Self { sender }
    }

    /// Send to all current subscribers; returns how many received it
    pub fn publish(&self, message: ChatMessage) -> usize {
        // An error only means nobody is listening.
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}
