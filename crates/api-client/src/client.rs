//! Device view API client.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::error::{ApiError, Result};
use crate::types::{ApiErrorResponse, ContentPayload, DateRange};

/// Request timeout: a hung connection must not stall the poll loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_LOG_BODY_CHARS: usize = 512;

/// Source of display content, as seen by the sync scheduler.
///
/// The scheduler depends on this seam so cycle behavior can be exercised
/// against scripted responses in tests.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the device's view payload for the given date window.
    async fn fetch_view(&self, token: &str, range: DateRange) -> Result<ContentPayload>;
}

/// Client for the device view endpoint of the calendar-share service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the service (e.g., "https://cal.example.org")
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create headers for an authenticated request.
    fn headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::auth("Invalid device token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body, preserving the server's error envelope.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ApiError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(ApiError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize view response. Body: {}, Error: {}",
                body,
                e
            );
            ApiError::from(e)
        })
    }
}

#[async_trait]
impl ContentSource for ApiClient {
    /// GET /api/devices/view?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD
    async fn fetch_view(&self, token: &str, range: DateRange) -> Result<ContentPayload> {
        let url = format!(
            "{}/api/devices/view?startDate={}&endDate={}",
            self.base_url,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d"),
        );
        debug!("Fetching device view: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(Self::headers(token)?)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("https://cal.example.org/");
        assert_eq!(client.base_url, "https://cal.example.org");
    }

    #[test]
    fn headers_reject_control_characters_in_token() {
        let err = ApiClient::headers("bad\ntoken").unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
