use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Malformed or incomplete request body. Carries an example payload
    /// echoed back to the caller so they can fix their integration.
    Validation {
        /// Human-readable description of what was wrong.
        message: String,
        /// Example of a well-formed payload for this endpoint.
        example: Option<serde_json::Value>,
    },
    /// HTTP method not supported by the endpoint.
    MethodNotAllowed {
        /// Methods the endpoint does accept.
        allowed: Vec<&'static str>,
    },
    /// Missing or unusable process configuration (credentials, addresses).
    Configuration(String),
    /// No contact match and no usable default recipient.
    NoRecipient(String),
    /// A resolved recipient address that is not a valid email address.
    InvalidRecipient(String),
    /// The mail transport rejected the send.
    Delivery {
        /// Provider error message.
        message: String,
        /// Provider error code when available (e.g. "EAUTH", "550").
        code: Option<String>,
    },
    /// Error interacting with an external API.
    ExternalApi(String),
    /// Internal server error (catch-all).
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation { message, .. } => write!(f, "Validation error: {}", message),
            AppError::MethodNotAllowed { allowed } => {
                write!(f, "Method not allowed (expected {})", allowed.join(", "))
            }
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NoRecipient(msg) => write!(f, "No recipient: {}", msg),
            AppError::InvalidRecipient(msg) => write!(f, "Invalid recipient: {}", msg),
            AppError::Delivery { message, code } => match code {
                Some(code) => write!(f, "Delivery error ({}): {}", code, message),
                None => write!(f, "Delivery error: {}", message),
            },
            AppError::ExternalApi(msg) => write!(f, "External API error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to the status code and JSON envelope the
    /// webhook callers expect. Logs errors based on severity; secrets never
    /// appear in either the log line or the response body.
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation { message, example } => {
                tracing::warn!("Rejected request body: {}", message);
                let mut body = json!({
                    "error": "validation_error",
                    "message": message,
                });
                if let Some(example) = example {
                    body["example"] = example.clone();
                }
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::MethodNotAllowed { allowed } => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({
                    "error": "method_not_allowed",
                    "message": "This endpoint only accepts the listed methods",
                    "allowedMethods": allowed,
                }),
            ),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "configuration_error",
                        "message": "Service configuration is incomplete",
                    }),
                )
            }
            AppError::NoRecipient(msg) => {
                tracing::error!("No recipient resolved: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "no_recipient",
                        "message": msg,
                    }),
                )
            }
            AppError::InvalidRecipient(msg) => {
                tracing::error!("Invalid recipient: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "invalid_recipient",
                        "message": msg,
                    }),
                )
            }
            AppError::Delivery { message, code } => {
                tracing::error!("Mail delivery failed (code={:?}): {}", code, message);
                let mut body = json!({
                    "error": "delivery_error",
                    "message": "Failed to dispatch notification email",
                    "details": message,
                });
                if let Some(code) = code {
                    body["code"] = json!(code);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            AppError::ExternalApi(msg) => {
                tracing::error!("External API error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "external_api_error",
                        "message": "External service error",
                    }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "Internal server error",
                    }),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.clone().into_response();
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_error_display_includes_code() {
        let err = AppError::Delivery {
            message: "535 authentication rejected".to_string(),
            code: Some("EAUTH".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Delivery error (EAUTH): 535 authentication rejected"
        );
    }

    #[test]
    fn context_wraps_source() {
        let base: Result<(), AppError> = Err(AppError::Internal("boom".to_string()));
        let err = base.context("dispatching notification").unwrap_err();
        assert_eq!(
            err.to_string(),
            "dispatching notification: Internal error: boom"
        );
    }
}
