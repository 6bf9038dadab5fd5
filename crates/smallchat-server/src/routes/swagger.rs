//! OpenAPI Documentation
//!
//! Centralized API documentation using utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{
    ClearResponse, MessagePage, MessageResponse, PostMessageRequest, ReloadResponse,
    StatsResponse,
};
use crate::HealthCheck;

/// Registers the Bearer scheme used by the admin endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health_check,
        // History
        super::messages::list_messages,
        super::messages::recent_messages,
        super::messages::page_messages,
        super::messages::stats,
        // Admin
        super::messages::post_message,
        super::messages::clear_messages,
        super::messages::reload_messages,
    ),
    info(
        title = "SmallChat API",
        version = "0.1.0",
        description = "Single-room chat with a time-bounded message history.\n\nLive traffic flows over the WebSocket at /ws; these endpoints query and maintain the history.",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Messages", description = "Message history queries"),
        (name = "Admin", description = "History maintenance (Bearer API key)"),
    ),
    components(
        schemas(
            HealthCheck,
            MessageResponse,
            MessagePage,
            PostMessageRequest,
            StatsResponse,
            ClearResponse,
            ReloadResponse,
        )
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/messages",
            "/api/messages/recent",
            "/api/messages/page",
            "/api/stats",
            "/api/messages/clear",
            "/api/messages/reload",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
