//! HTTP client for the Postflight ingest API
//!
//! This client speaks the ingest protocol for pushing tracked events from
//! the SDK to a Postflight server.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::SdkConfig;
use crate::error::{Error, Result};
use crate::event::TrackedEvent;

/// Response from POST /v1/events
#[derive(Debug, Deserialize)]
pub struct IngestResponse {
    /// Number of events accepted
    pub accepted: usize,
    /// Number of events rejected (duplicates, validation errors)
    #[serde(default)]
    pub rejected: usize,
}

/// HTTP client for the Postflight ingest API
pub struct IngestClient {
    http_client: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

impl IngestClient {
    /// Create a new ingest client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &SdkConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.endpoint.trim_end_matches('/').to_string();

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", config.sdk_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| Error::Config(format!("invalid sdk_key: {}", e)))?,
        );

        headers.insert(
            "X-Postflight-Client",
            HeaderValue::from_static(concat!("postflight-rs/", env!("CARGO_PKG_VERSION"))),
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            max_retries: config.max_retries,
        })
    }

    /// Send a batch of events for an install
    ///
    /// Returns the number of events accepted and rejected.
    pub async fn send_events(
        &self,
        install_id: &str,
        events: &[TrackedEvent],
    ) -> Result<IngestResponse> {
        let url = format!("{}/v1/events", self.base_url);

        let request_body = SendEventsRequest { install_id, events };

        let response = self
            .http_client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let result: IngestResponse = response
                .json()
                .await
                .map_err(|e| Error::Transport(format!("failed to parse response: {}", e)))?;
            Ok(result)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Transport(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    /// Send events with retry logic
    ///
    /// Retries transient failures (5xx, timeouts) with exponential backoff.
    pub async fn send_events_with_retry(
        &self,
        install_id: &str,
        events: &[TrackedEvent],
    ) -> Result<IngestResponse> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "Retrying send_events (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.send_events(install_id, events).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    // Check if error is retryable
                    if is_retryable_error(&e) {
                        tracing::warn!("Transient error sending events: {}", e);
                        last_error = Some(e);
                        continue;
                    } else {
                        // Non-retryable error, fail immediately
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Transport("max retries exceeded".to_string())))
    }

    /// Check if the SDK can connect to the ingest server
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.http_client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Request body for POST /v1/events
#[derive(Serialize)]
struct SendEventsRequest<'a> {
    install_id: &'a str,
    events: &'a [TrackedEvent],
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Transport(msg) => {
            // Retry on 5xx errors
            msg.contains("50") && (msg.contains("API error") || msg.contains("HTTP"))
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_valid_config() {
        let config = SdkConfig::default();
        assert!(IngestClient::new(&config).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = SdkConfig::new("pf_live_test");
        assert!(IngestClient::new(&config).is_ok());
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let config = SdkConfig {
            endpoint: "https://ingest.example.com/".to_string(),
            ..SdkConfig::new("pf_live_test")
        };
        let client = IngestClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://ingest.example.com");
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::Transport(
            "API error (500): internal error".to_string()
        )));
        assert!(is_retryable_error(&Error::Transport(
            "HTTP request failed: timeout".to_string()
        )));
        assert!(!is_retryable_error(&Error::Transport(
            "API error (400): bad request".to_string()
        )));
        assert!(!is_retryable_error(&Error::Transport(
            "API error (401): unauthorized".to_string()
        )));
    }
}
