use std::time::Duration;

use crate::call_models::CallDetail;
use crate::errors::AppError;

/// Client for the call platform's detail API.
///
/// Some providers deliver a thin webhook and expect a follow-up fetch for
/// the transcript, recording, and cost breakdown. The fetched record is
/// merged on top of the webhook payload before rendering.
#[derive(Clone)]
pub struct CallApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CallApiClient {
    /// Creates a new `CallApiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the call platform API.
    /// * `token` - Optional bearer token for authentication.
    pub fn new(base_url: String, token: Option<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApi(format!("Failed to create call API client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Fetch the detail record for a call.
    ///
    /// # Arguments
    ///
    /// * `call_id` - The ID of the call to fetch.
    pub async fn fetch_call(&self, call_id: &str) -> Result<CallDetail, AppError> {
        let url = format!("{}/v1/calls/{}", self.base_url, call_id);
        tracing::info!("Fetching call detail for {} from {}", call_id, url);

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Call API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Call API returned {}: {}",
                status, error_text
            )));
        }

        let detail = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse call API response: {}", e))
        })?;

        Ok(detail)
    }
}
