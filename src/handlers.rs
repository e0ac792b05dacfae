use axum::{
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::call_api::CallApiClient;
use crate::config::Config;
use crate::mailer::Mailer;
use crate::webhook_handler;

/// Shared application state injected into handlers.
///
/// Read-only after startup; each request gets its own value objects.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Mail dispatcher (OAuth2 + SMTP).
    pub mailer: Mailer,
    /// Client for the call platform detail API (optional).
    pub call_api: Option<CallApiClient>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "call-notify-api",
            "version": "0.1.0"
        })),
    )
}

/// Build the application router.
///
/// Shared with the integration tests so they exercise the same routing,
/// method fallbacks, and middleware stack as the running service.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/webhooks/call",
            get(webhook_handler::platform_usage)
                .post(webhook_handler::platform_webhook)
                .fallback(webhook_handler::method_not_allowed),
        )
        .route(
            "/api/v1/webhooks/retell",
            get(webhook_handler::retell_usage)
                .post(webhook_handler::retell_webhook)
                .fallback(webhook_handler::method_not_allowed),
        )
        .with_state(state)
        // Request size limit: 5MB max payload (prevents memory exhaustion)
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(5 * 1024 * 1024)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
