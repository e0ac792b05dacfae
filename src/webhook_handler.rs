use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::call_models::CallWebhookPayload;
use crate::contacts;
use crate::errors::{AppError, ResultExt};
use crate::handlers::AppState;
use crate::report;

/// Static description of one provider integration.
///
/// The pipeline (normalize, resolve, render, dispatch) is shared; the
/// adapter only carries what differs per provider: naming, endpoint, and the
/// example payload echoed on validation failures.
#[derive(Debug, Clone, Copy)]
pub struct ProviderAdapter {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub required_fields: &'static [&'static str],
}

/// Generic call platform: flat call record.
pub const PLATFORM: ProviderAdapter = ProviderAdapter {
    name: "platform",
    endpoint: "/api/v1/webhooks/call",
    required_fields: &["id", "status"],
};

/// Retell-style provider: `{event, call}` envelope.
pub const RETELL: ProviderAdapter = ProviderAdapter {
    name: "retell",
    endpoint: "/api/v1/webhooks/retell",
    required_fields: &["event", "call.call_id"],
};

impl ProviderAdapter {
    fn example(&self) -> Value {
        match self.name {
            "retell" => json!({
                "event": "call_analyzed",
                "call": {
                    "call_id": "call_abc123",
                    "call_status": "ended",
                    "from_number": "+15551234567",
                    "to_number": "+15550001111",
                    "duration_ms": 65000
                }
            }),
            _ => json!({
                "id": "call_abc123",
                "status": "completed",
                "from": "5551234567",
                "to": "5550001111",
                "duration": 65000
            }),
        }
    }

    fn usage(&self) -> Value {
        json!({
            "status": "ok",
            "message": format!(
                "POST a {} call-completion event to this endpoint to trigger an email notification",
                self.name
            ),
            "usage": {
                "method": "POST",
                "endpoint": self.endpoint,
                "requiredFields": self.required_fields,
                "example": self.example(),
            }
        })
    }

    fn attach_example(&self, err: AppError) -> AppError {
        match err {
            AppError::Validation {
                message,
                example: None,
            } => AppError::Validation {
                message,
                example: Some(self.example()),
            },
            other => other,
        }
    }
}

/// GET handler: describe expected usage instead of failing.
pub async fn platform_usage() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(PLATFORM.usage()))
}

/// GET handler for the Retell-style endpoint.
pub async fn retell_usage() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(RETELL.usage()))
}

/// Fallback for unsupported HTTP methods on the webhook routes.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed {
        allowed: vec!["GET", "POST", "OPTIONS"],
    }
}

/// Generic call-platform webhook endpoint.
pub async fn platform_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    process_call_event(&state, &PLATFORM, &body).await
}

/// Retell-style webhook endpoint.
pub async fn retell_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    process_call_event(&state, &RETELL, &body).await
}

/// The call-event-to-notification pipeline.
///
/// Flow:
/// 1. Parse and normalize the provider payload into the canonical record.
/// 2. Drop non-completion events with a 200 (policy, not an error).
/// 3. Optionally merge the detail record fetched from the call platform API.
/// 4. Resolve the recipient against the contact directory (fresh read).
/// 5. Render the report and dispatch the email.
async fn process_call_event(
    state: &Arc<AppState>,
    provider: &ProviderAdapter,
    body: &[u8],
) -> Result<(StatusCode, Json<Value>), AppError> {
    tracing::info!("Received {} call webhook", provider.name);

    let payload: CallWebhookPayload =
        serde_json::from_slice(body).map_err(|e| AppError::Validation {
            message: format!(
                "Request body does not match any supported {} payload shape: {}",
                provider.name, e
            ),
            example: Some(provider.example()),
        })?;

    let mut record = payload
        .into_record()
        .map_err(|e| provider.attach_example(e))?;

    // Only completed calls produce a notification; everything else is
    // acknowledged and dropped.
    if !record.is_completed() {
        tracing::info!(
            "Call {} status '{}' is not a completion event; skipping notification",
            record.id,
            record.status
        );
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Event received but not processed",
                "call": {
                    "id": record.id,
                    "status": record.status,
                },
            })),
        ));
    }

    // Follow-up fetch of full call details, best effort.
    if let Some(ref call_api) = state.call_api {
        match call_api.fetch_call(&record.id).await {
            Ok(detail) => {
                tracing::debug!("Merged detail record for call {}", record.id);
                record.merge_detail(detail);
            }
            Err(e) => {
                tracing::warn!(
                    "Call detail fetch failed for {}; rendering webhook fields only: {}",
                    record.id,
                    e
                );
            }
        }
    }

    let directory = contacts::load_directory(&state.config.contacts_path).await;
    let recipient = contacts::resolve_recipient(
        record.from.as_deref(),
        &directory,
        &state.config.default_recipient,
    )?;

    let rendered = report::render(&record);
    let subject = format!("Call Summary - {}", record.id);

    let email = state
        .mailer
        .dispatch(&recipient.email, &subject, &rendered)
        .await
        .context(format!("Dispatching notification for call {}", record.id))?;

    tracing::info!(
        "Webhook processing complete: call={}, recipient={}, message_id={}",
        record.id,
        recipient.email,
        email.message_id
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Notification sent",
            "call": {
                "id": record.id,
                "status": record.status,
                "from": record.from,
                "to": record.to,
                "recipient": recipient.email,
                "contact": recipient.contact_name,
            },
            "email": email,
        })),
    ))
}
