//! WebSocket chat transport
//!
//! Inbound frames are JSON objects tagged by `action` (`join` or `chat`).
//! Every saved message is broadcast to all sockets as its JSON form; errors
//! go back only to the socket that caused them.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast::error::RecvError, mpsc};

use smallchat::{ChatMessage, DomainError};

use crate::AppState;

/// Frames a client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientFrame {
    Join {
        sender: String,
    },
    #[serde(rename_all = "camelCase")]
    Chat {
        content: String,
        sender: Option<String>,
        reply_to_id: Option<String>,
        reply_to_sender: Option<String>,
        reply_to_content: Option<String>,
    },
}

/// Per-connection state
#[derive(Debug, Default)]
struct Session {
    /// Name given in the last `join`
    sender: Option<String>,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut events = state.hub.subscribe();
    tracing::info!(
        "WebSocket client connected ({} online)",
        state.hub.subscriber_count()
    );
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<String>();

    // Writer: broadcast events plus replies meant for this socket only
    let mut writer = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                event = events.recv() => match event {
                    Ok(message) => match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to encode message {}: {}", message.id, e);
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("WebSocket client lagging, skipped {} messages", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                direct = direct_rx.recv() => match direct {
                    Some(text) => text,
                    None => break,
                },
            };

            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::default();
    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = &mut writer => break,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = handle_frame(&state, &mut session, &text).await {
                    tracing::debug!("Rejected WebSocket frame: {}", e);
                    let reply = serde_json::json!({ "error": e.to_string() }).to_string();
                    let _ = direct_tx.send(reply);
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    writer.abort();

    if let Some(sender) = session.sender.take() {
        if let Err(e) = state.post_message(ChatMessage::leave(sender.as_str())).await {
            tracing::warn!("Failed to record LEAVE for {}: {}", sender, e);
        }
    }
}

/// Apply one inbound frame to the session
async fn handle_frame(
    state: &AppState,
    session: &mut Session,
    text: &str,
) -> Result<ChatMessage, DomainError> {
    let frame: ClientFrame = serde_json::from_str(text)
        .map_err(|e| DomainError::validation(format!("Invalid frame: {}", e)))?;

    match frame {
        ClientFrame::Join { sender } => {
            let sender = non_blank(Some(sender))
                .ok_or_else(|| DomainError::validation("'sender' is required"))?;
            session.sender = Some(sender.clone());
            state.post_message(ChatMessage::join(sender)).await
        }
        ClientFrame::Chat {
            content,
            sender,
            reply_to_id,
            reply_to_sender,
            reply_to_content,
        } => {
            let sender = non_blank(sender)
                .or_else(|| session.sender.clone())
                .ok_or_else(|| DomainError::validation("'sender' is required (join first)"))?;

            let message = ChatMessage::chat(sender, content);
            let message = match reply_to_id {
                Some(id) => message.with_reply(id, reply_to_sender, reply_to_content),
                None => message,
            };
            state.post_message(message).await
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
