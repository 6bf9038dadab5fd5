//! SmallChat API Routes
//!
//! - /ws - WebSocket chat transport
//! - /api/messages - history queries (public) and posting (admin)
//! - /api/messages/clear, /api/messages/reload - admin maintenance
//! - /api/stats - store statistics

use axum::http::StatusCode;

use smallchat::DomainError;

pub mod messages;
pub mod swagger;
pub mod ws;

/// Map a domain error to an HTTP error response
pub(crate) fn error_response(err: DomainError) -> (StatusCode, String) {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, err.to_string())
}
