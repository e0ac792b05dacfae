mod call_api;
mod call_models;
mod config;
mod contacts;
mod errors;
mod handlers;
mod mailer;
mod report;
mod webhook_handler;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::call_api::CallApiClient;
use crate::config::Config;
use crate::mailer::Mailer;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading (credentials validated eagerly).
/// - The mail dispatcher and the optional call-detail API client.
/// - HTTP routes and middleware (CORS, request size limit).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "call_notify_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize the mail dispatcher. Credentials were validated by the
    // config loader; this additionally verifies the sender address parses.
    let mailer = match Mailer::new(&config) {
        Ok(mailer) => {
            tracing::info!("✓ Mail dispatcher initialized for {}", config.mail_account);
            mailer
        }
        Err(e) => {
            anyhow::bail!("Failed to initialize mail dispatcher: {}", e);
        }
    };

    // Initialize the optional call-detail API client
    let call_api = match config.call_api_base_url.clone() {
        Some(base_url) => match CallApiClient::new(base_url.clone(), config.call_api_token.clone())
        {
            Ok(client) => {
                tracing::info!("✓ Call detail client initialized: {}", base_url);
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize call API client: {}", e);
                None
            }
        },
        None => None,
    };

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        mailer,
        call_api,
    });

    let app = handlers::router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
