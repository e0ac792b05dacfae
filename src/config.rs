#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub mail_account: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_refresh_token: String,
    pub oauth_token_uri: String,
    pub smtp_host: String,
    pub default_recipient: String,
    pub contacts_path: String,
    pub call_api_base_url: Option<String>, // Optional: enables the call-detail enrichment fetch
    pub call_api_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            mail_account: std::env::var("MAIL_ACCOUNT")
                .map_err(|_| anyhow::anyhow!("MAIL_ACCOUNT environment variable required"))
                .and_then(|addr| {
                    if addr.trim().is_empty() {
                        anyhow::bail!("MAIL_ACCOUNT cannot be empty");
                    }
                    if !addr.contains('@') {
                        anyhow::bail!("MAIL_ACCOUNT must be an email address");
                    }
                    Ok(addr)
                })?,
            oauth_client_id: std::env::var("OAUTH_CLIENT_ID")
                .map_err(|_| anyhow::anyhow!("OAUTH_CLIENT_ID environment variable required"))
                .and_then(|id| {
                    if id.trim().is_empty() {
                        anyhow::bail!("OAUTH_CLIENT_ID cannot be empty");
                    }
                    Ok(id)
                })?,
            oauth_client_secret: std::env::var("OAUTH_CLIENT_SECRET")
                .map_err(|_| anyhow::anyhow!("OAUTH_CLIENT_SECRET environment variable required"))
                .and_then(|secret| {
                    if secret.trim().is_empty() {
                        anyhow::bail!("OAUTH_CLIENT_SECRET cannot be empty");
                    }
                    Ok(secret)
                })?,
            oauth_refresh_token: std::env::var("OAUTH_REFRESH_TOKEN")
                .map_err(|_| anyhow::anyhow!("OAUTH_REFRESH_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("OAUTH_REFRESH_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            oauth_token_uri: std::env::var("OAUTH_TOKEN_URI")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://oauth2.googleapis.com/token".to_string()),
            smtp_host: std::env::var("SMTP_HOST")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "smtp.gmail.com".to_string()),
            default_recipient: std::env::var("DEFAULT_RECIPIENT")
                .map_err(|_| anyhow::anyhow!("DEFAULT_RECIPIENT environment variable required"))
                .and_then(|addr| {
                    if addr.trim().is_empty() {
                        anyhow::bail!("DEFAULT_RECIPIENT cannot be empty");
                    }
                    if !addr.contains('@') {
                        anyhow::bail!("DEFAULT_RECIPIENT must be an email address");
                    }
                    Ok(addr)
                })?,
            contacts_path: std::env::var("CONTACTS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "contacts.json".to_string()),
            call_api_base_url: std::env::var("CALL_API_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("CALL_API_BASE_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?,
            call_api_token: std::env::var("CALL_API_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        if !config.oauth_token_uri.starts_with("http://")
            && !config.oauth_token_uri.starts_with("https://")
        {
            anyhow::bail!("OAUTH_TOKEN_URI must start with http:// or https://");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Mail account: {}", config.mail_account);
        tracing::debug!("Default recipient: {}", config.default_recipient);
        tracing::debug!("Contacts path: {}", config.contacts_path);
        if let Some(ref base) = config.call_api_base_url {
            tracing::info!("Call-detail API configured: {}", base);
        }
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }
}
