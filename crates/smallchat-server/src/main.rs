use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use smallchat::{ChatMessage, DomainError, MessageRepository};

mod adapters;
mod application;
mod auth;
mod config;
mod models;
mod routes;
mod services;

#[cfg(test)]
mod testing;

use adapters::{DisabledMessageRepository, PgMessageRepository};
use application::MessageStore;
use config::ChatConfig;
use services::hub::ChatHub;
use services::scheduler;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MessageStore>,
    pub hub: ChatHub,
    pub retention: chrono::Duration,
    pub retention_days: i64,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<MessageStore>, config: &ChatConfig) -> Self {
        Self {
            store,
            hub: ChatHub::new(),
            retention: config.retention(),
            retention_days: config.retention_days,
            api_key: config.api_key.as_deref().map(Arc::from),
        }
    }

    /// Save a message, then broadcast it to every connected client
    pub async fn post_message(&self, message: ChatMessage) -> Result<ChatMessage, DomainError> {
        self.store.save(message.clone()).await?;
        let receivers = self.hub.publish(message.clone());
        tracing::debug!("Message {} delivered to {} clients", message.id, receivers);
        Ok(message)
    }
}

#[derive(Serialize, ToSchema)]
struct HealthCheck {
    status: String,
    message: String,
    version: String,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthCheck)),
    tag = "Health"
)]
async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "SmallChat API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the full router over `state`
pub fn app(state: AppState) -> Router {
    // Protected routes (require authentication)
    let admin_routes = routes::messages::admin_router().route_layer(
        middleware::from_fn_with_state(state.clone(), auth::auth_middleware),
    );

    // OpenAPI documentation
    let openapi = routes::swagger::ApiDoc::openapi();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .route("/ws", get(routes::ws::ws_handler))
        .merge(routes::messages::router())
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secrets: shuttle_runtime::SecretStore,
) -> shuttle_axum::ShuttleAxum {
    tracing::info!("💬 SmallChat API initializing...");

    let config = ChatConfig::from_lookup(|key| secrets.get(key))
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    if config.api_key.is_some() {
        tracing::info!("🔐 API key authentication enabled for admin routes");
    } else {
        tracing::warn!("⚠️  No SMALLCHAT_API_KEY set - admin authentication disabled");
    }

    let repo: Arc<dyn MessageRepository> = if config.persistence_enabled {
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {}", e))?;
        tracing::info!("✅ Database migrations completed");

        Arc::new(PgMessageRepository::new(pool, config.partition.clone()))
    } else {
        tracing::warn!("⚠️  Persistence disabled - history lives in memory only");
        Arc::new(DisabledMessageRepository::new())
    };

    let store = Arc::new(MessageStore::new(repo, config.persistence()));

    let loaded = store.hydrate(config.retention()).await;
    tracing::info!(
        "📥 Hydrated {} messages from the last {} days",
        loaded,
        config.retention_days
    );

    if scheduler::maybe_start_sweep(store.clone(), config.sweep()).is_none() {
        tracing::warn!("⚠️  Retention sweep disabled");
    }

    let state = AppState::new(store, &config);
    let router = app(state);

    tracing::info!("📚 Swagger UI: /swagger-ui");
    tracing::info!("✅ SmallChat API ready");

    Ok(router.into())
}
