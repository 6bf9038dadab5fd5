//! SmallChat API Client

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// API Client for SmallChat
pub struct SmallChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

// ============================================
// API Response Types
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub sender: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
    pub reply_to_sender: Option<String>,
}

impl MessageResponse {
    pub fn is_system(&self) -> bool {
        self.message_type != "CHAT"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_messages: usize,
    pub retention_days: i64,
    pub persistence_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReloadResponse {
    pub loaded: usize,
}

#[derive(Debug, Serialize)]
pub struct PostMessageRequest {
    pub sender: String,
    pub content: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

impl SmallChatClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    /// Test connection with health check
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        Ok(resp.status().is_success())
    }

    /// Store statistics
    pub async fn stats(&self) -> Result<StatsResponse> {
        let url = format!("{}/api/stats", self.base_url);
        json(self.client.get(&url)).await
    }

    /// All retained messages, oldest first
    pub async fn list_messages(&self, include_system: bool) -> Result<Vec<MessageResponse>> {
        let url = format!("{}/api/messages", self.base_url);
        json(
            self.client
                .get(&url)
                .query(&[("includeSystem", include_system)]),
        )
        .await
    }

    /// The newest `limit` messages, oldest first
    pub async fn recent_messages(
        &self,
        limit: usize,
        include_system: bool,
    ) -> Result<Vec<MessageResponse>> {
        let url = format!("{}/api/messages/recent", self.base_url);
        json(self.client.get(&url).query(&[
            ("limit", limit.to_string()),
            ("includeSystem", include_system.to_string()),
        ]))
        .await
    }

    /// Post a message as `sender`
    pub async fn send_message(
        &self,
        sender: &str,
        content: &str,
        message_type: Option<&str>,
    ) -> Result<MessageResponse> {
        let url = format!("{}/api/messages", self.base_url);

        let request = PostMessageRequest {
            sender: sender.to_string(),
            content: content.to_string(),
            message_type: message_type.map(|s| s.to_string()),
        };

        json(self.authorized(self.client.post(&url)).json(&request)).await
    }

    /// Clear the in-memory history
    pub async fn clear(&self) -> Result<()> {
        let url = format!("{}/api/messages/clear", self.base_url);
        check(self.authorized(self.client.post(&url))).await?;
        Ok(())
    }

    /// Reload history from the durable store
    pub async fn reload(&self) -> Result<ReloadResponse> {
        let url = format!("{}/api/messages/reload", self.base_url);
        json(self.authorized(self.client.post(&url))).await
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

/// Send a request and fail on non-success status
async fn check(request: RequestBuilder) -> Result<Response> {
    let resp = request
        .send()
        .await
        .context("Failed to connect to SmallChat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("API error ({}): {}", status, body);
    }

    Ok(resp)
}

async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    check(request)
        .await?
        .json()
        .await
        .context("Failed to parse response")
}
