//! Message Routes - history queries and admin operations
//!
//! HTTP handlers that delegate to MessageStore.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use smallchat::DomainError;

use super::error_response;
use crate::models::{
    ClearResponse, MessagePage, MessageResponse, MessagesQuery, PageQuery, PostMessageRequest,
    RecentMessagesQuery, ReloadResponse, StatsResponse, MAX_PAGE_SIZE,
};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 100;

/// List all messages, oldest first
#[utoipa::path(
    get,
    path = "/api/messages",
    params(MessagesQuery),
    responses(
        (status = 200, description = "All retained messages", body = Vec<MessageResponse>)
    ),
    tag = "Messages"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Json<Vec<MessageResponse>> {
    let messages = state
        .store
        .get_all(query.include_system.unwrap_or(true))
        .await;

    Json(messages.into_iter().map(MessageResponse::from).collect())
}

/// Most recent messages, oldest first
#[utoipa::path(
    get,
    path = "/api/messages/recent",
    params(RecentMessagesQuery),
    responses(
        (status = 200, description = "Newest messages", body = Vec<MessageResponse>)
    ),
    tag = "Messages"
)]
pub async fn recent_messages(
    State(state): State<AppState>,
    Query(query): Query<RecentMessagesQuery>,
) -> Json<Vec<MessageResponse>> {
    let messages = state
        .store
        .get_recent(query.clamped_limit(), query.include_system.unwrap_or(true))
        .await;

    Json(messages.into_iter().map(MessageResponse::from).collect())
}

/// One page of the full history
#[utoipa::path(
    get,
    path = "/api/messages/page",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of messages", body = MessagePage),
        (status = 400, description = "Invalid page or size")
    ),
    tag = "Messages"
)]
pub async fn page_messages(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MessagePage>, (StatusCode, String)> {
    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 0 {
        return Err(error_response(DomainError::validation("page must be >= 0")));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(error_response(DomainError::validation(format!(
            "size must be between 1 and {}",
            MAX_PAGE_SIZE
        ))));
    }

    let (page, size) = (page as usize, size as usize);
    let all = state.store.get_all(true).await;
    let total = all.len();
    let messages = all
        .into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .map(MessageResponse::from)
        .collect();

    Ok(Json(MessagePage {
        page,
        size,
        total,
        messages,
    }))
}

/// Store statistics
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse)
    ),
    tag = "Messages"
)]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        total_messages: state.store.count().await,
        retention_days: state.retention_days,
        persistence_enabled: state.store.persistence_enabled(),
    })
}

/// Post a message (saved, then broadcast to connected clients)
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Invalid message"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn post_message(
    State(state): State<AppState>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let message = payload.into_message().map_err(error_response)?;
    let message = state.post_message(message).await.map_err(error_response)?;

    Ok(Json(message.into()))
}

/// Clear the in-memory history (the durable store is untouched)
#[utoipa::path(
    post,
    path = "/api/messages/clear",
    responses(
        (status = 200, description = "History cleared", body = ClearResponse),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn clear_messages(State(state): State<AppState>) -> Json<ClearResponse> {
    state.store.clear_all().await;
    tracing::info!("In-memory history cleared via API");

    Json(ClearResponse {
        message: "Chat history cleared".to_string(),
    })
}

/// Rebuild memory from the durable store's retention window
#[utoipa::path(
    post,
    path = "/api/messages/reload",
    responses(
        (status = 200, description = "Messages loaded", body = ReloadResponse),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reload_messages(State(state): State<AppState>) -> Json<ReloadResponse> {
    let loaded = state.store.reload(state.retention).await;

    Json(ReloadResponse { loaded })
}

/// Public history routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(list_messages))
        .route("/api/messages/recent", get(recent_messages))
        .route("/api/messages/page", get(page_messages))
        .route("/api/stats", get(stats))
}

/// Admin routes (wrapped in the auth middleware by the caller)
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/api/messages", post(post_message))
        .route("/api/messages/clear", post(clear_messages))
        .route("/api/messages/reload", post(reload_messages))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use smallchat::{ChatMessage, MessageRepository};

    use crate::adapters::DisabledMessageRepository;
    use crate::application::{MessageStore, PersistenceConfig};
    use crate::config::ChatConfig;
    use crate::testing::{init_tracing, FakeMessageRepository};
    use crate::{app, AppState};

    fn state_with<R>(repo: Arc<R>, api_key: Option<&str>) -> AppState
    where
        R: MessageRepository + 'static,
    {
        init_tracing();
        let store = Arc::new(MessageStore::new(repo, PersistenceConfig::default()));
        let config = ChatConfig {
            api_key: api_key.map(str::to_string),
            ..ChatConfig::default()
        };
        AppState::new(store, &config)
    }

    fn memory_state(api_key: Option<&str>) -> AppState {
        state_with(Arc::new(DisabledMessageRepository::new()), api_key)
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn seed(state: &AppState, count: usize) {
        let base = Utc::now() - Duration::minutes(count as i64);
        for i in 0..count {
            let message = ChatMessage::chat("bob", format!("m{}", i))
                .with_id(format!("id-{}", i))
                .with_timestamp(base + Duration::seconds(i as i64));
            state.store.save(message).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_health() {
        let state = memory_state(None);
        let (status, body) = send(&state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_filters_system_messages() {
        let state = memory_state(None);
        state.store.save(ChatMessage::join("bob")).await.unwrap();
        seed(&state, 2).await;

        let (_, all) = send(&state, get("/api/messages")).await;
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (_, chats) = send(&state, get("/api/messages?includeSystem=false")).await;
        let chats = chats.as_array().unwrap();
        assert_eq!(chats.len(), 2);
        assert!(chats.iter().all(|m| m["type"] == "CHAT"));
    }

    #[tokio::test]
    async fn test_recent_limit_is_clamped() {
        let state = memory_state(None);
        seed(&state, 5).await;

        let (status, body) = send(&state, get("/api/messages/recent?limit=0")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.as_array().unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["id"], "id-4");

        let (_, body) = send(&state, get("/api/messages/recent?limit=2")).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["id-3", "id-4"]);

        let (_, body) = send(&state, get("/api/messages/recent?limit=1000")).await;
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_paging() {
        let state = memory_state(None);
        seed(&state, 5).await;

        let (status, body) = send(&state, get("/api/messages/page?page=1&size=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["size"], 2);
        assert_eq!(body["total"], 5);
        assert_eq!(body["messages"][0]["id"], "id-2");
        assert_eq!(body["messages"][1]["id"], "id-3");

        let (_, body) = send(&state, get("/api/messages/page?page=9&size=2")).await;
        assert!(body["messages"].as_array().unwrap().is_empty());

        let (status, _) = send(&state, get("/api/messages/page?page=-1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&state, get("/api/messages/page?size=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&state, get("/api/messages/page?size=1001")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats() {
        let state = memory_state(None);
        seed(&state, 3).await;

        let (status, body) = send(&state, get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalMessages"], 3);
        assert_eq!(body["retentionDays"], 3);
        assert_eq!(body["persistenceEnabled"], false);
    }

    #[tokio::test]
    async fn test_admin_routes_require_key() {
        let state = memory_state(Some("secret"));
        let payload = serde_json::json!({"sender": "bob", "content": "hi"});

        let (status, _) = send(&state, post_json("/api/messages", None, payload.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&state, post_json("/api/messages", Some("wrong"), payload.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&state, post_json("/api/messages", Some("secret"), payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sender"], "bob");
        assert_eq!(state.store.count().await, 1);

        // Reads stay public
        let (status, _) = send(&state, get("/api/messages")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_message_saves_and_broadcasts() {
        let state = memory_state(None);
        let mut events = state.hub.subscribe();

        let (status, body) = send(
            &state,
            post_json(
                "/api/messages",
                None,
                serde_json::json!({"sender": "  bob ", "content": "hi", "type": "chat"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sender"], "bob");
        assert_eq!(body["type"], "CHAT");

        let broadcast = events.recv().await.unwrap();
        assert_eq!(broadcast.id, body["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_post_message_validation() {
        let state = memory_state(None);

        let (status, _) = send(
            &state,
            post_json("/api/messages", None, serde_json::json!({"content": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            post_json(
                "/api/messages",
                None,
                serde_json::json!({"sender": "bob", "content": "hi", "type": "SHOUT"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.store.count().await, 0);
    }

    #[tokio::test]
    async fn test_clear_and_reload() {
        let stored = vec![
            ChatMessage::chat("bob", "one").with_id("A"),
            ChatMessage::chat("eve", "two").with_id("B"),
        ];
        let state = state_with(Arc::new(FakeMessageRepository::with_messages(stored)), None);
        assert_eq!(state.store.hydrate(state.retention).await, 2);

        let (status, _) = send(
            &state,
            post_json("/api/messages/clear", None, Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store.count().await, 0);

        let (status, body) = send(
            &state,
            post_json("/api/messages/reload", None, Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], 2);
        assert_eq!(state.store.count().await, 2);
    }
}
