use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::report::Report;

/// Result of a dispatched notification, surfaced verbatim to the webhook
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationResult {
    pub message_id: String,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// Seam between the dispatcher and the actual SMTP transport so tests can
/// substitute delivery.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Transmit one message, authenticating as `account` with the given
    /// OAuth2 access token.
    async fn send_message(
        &self,
        message: Message,
        account: &str,
        access_token: &str,
    ) -> Result<(), AppError>;
}

/// Production transport: XOAUTH2-authenticated SMTP relay.
pub struct XoauthSmtpTransport {
    host: String,
}

impl XoauthSmtpTransport {
    pub fn new(host: String) -> Self {
        Self { host }
    }
}

#[async_trait]
impl MailTransport for XoauthSmtpTransport {
    async fn send_message(
        &self,
        message: Message,
        account: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(|e| AppError::Configuration(format!("SMTP relay setup failed: {}", e)))?
            .credentials(Credentials::new(
                account.to_string(),
                access_token.to_string(),
            ))
            .authentication(vec![Mechanism::Xoauth2])
            .build();

        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(map_smtp_error)
    }
}

/// Map an SMTP rejection onto the delivery taxonomy. Authentication-class
/// replies (530/534/535/538) surface as the provider code "EAUTH".
fn map_smtp_error(err: lettre::transport::smtp::Error) -> AppError {
    let code = err.status().map(|c| c.to_string());
    let code = match code {
        Some(c) if c.starts_with("53") => Some("EAUTH".to_string()),
        other => other,
    };
    AppError::Delivery {
        message: err.to_string(),
        code,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Mail dispatcher: exchanges the refresh token for an access token per
/// dispatch and hands the rendered report to the transport.
///
/// Constructed once at startup from configuration and passed through
/// application state; nothing here is ambient global state.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    account: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: String,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    /// Build the production dispatcher. Fails fast when the configured
    /// sender address is unusable.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let transport = Arc::new(XoauthSmtpTransport::new(config.smtp_host.clone()));
        Self::with_transport(config, transport)
    }

    /// Build a dispatcher with a substitute transport.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, AppError> {
        config
            .mail_account
            .parse::<Mailbox>()
            .map_err(|e| AppError::Configuration(format!("MAIL_ACCOUNT is not usable: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::Configuration(format!("Failed to create token HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            account: config.mail_account.clone(),
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            refresh_token: config.oauth_refresh_token.clone(),
            token_uri: config.oauth_token_uri.clone(),
            transport,
        })
    }

    /// Exchange the refresh token for a short-lived access token.
    async fn fetch_access_token(&self) -> Result<String, AppError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Delivery {
                message: format!("Token endpoint request failed: {}", e),
                code: None,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Token endpoint rejected refresh ({}): {}", status, body);
            return Err(AppError::Delivery {
                message: format!("Token endpoint returned {}", status),
                code: Some("EAUTH".to_string()),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| AppError::Delivery {
            message: format!("Failed to parse token response: {}", e),
            code: Some("EAUTH".to_string()),
        })?;

        tracing::debug!("Obtained access token for {}", self.account);
        Ok(token.access_token)
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        report: &Report,
    ) -> Result<(Message, String), AppError> {
        let from: Mailbox = self
            .account
            .parse()
            .map_err(|e| AppError::Configuration(format!("MAIL_ACCOUNT is not usable: {}", e)))?;
        let to_mailbox: Mailbox = to.parse().map_err(|e| {
            AppError::InvalidRecipient(format!("Recipient '{}' is not usable: {}", to, e))
        })?;

        let domain = self.account.split('@').nth(1).unwrap_or("localhost");
        let message_id = format!("<{}@{}>", Uuid::new_v4(), domain);

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(
                report.text.clone(),
                report.html.clone(),
            ))
            .map_err(|e| AppError::Internal(format!("Failed to build email message: {}", e)))?;

        Ok((message, message_id))
    }

    /// Render-to-wire step: authenticate and transmit one report.
    ///
    /// No retries; a transport rejection is terminal for this request.
    pub async fn dispatch(
        &self,
        to: &str,
        subject: &str,
        report: &Report,
    ) -> Result<NotificationResult, AppError> {
        let access_token = self.fetch_access_token().await?;
        let (message, message_id) = self.build_message(to, subject, report)?;

        self.transport
            .send_message(message, &self.account, &access_token)
            .await?;

        tracing::info!("Notification dispatched to {} ({})", to, message_id);

        Ok(NotificationResult {
            message_id,
            accepted: vec![to.to_string()],
            rejected: Vec::new(),
        })
    }
}
