//! JSON-over-HTTP helper for REST providers (Pinecone, rerank APIs).
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// A JSON POST client with timeout and bounded retries.
#[derive(Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl JsonClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client, max_retries })
    }

    /// POST `body` to `url` with the given headers and decode the JSON response.
    ///
    /// Errors are returned as plain messages; callers wrap them in the
    /// error kind that matches their provider role.
    pub async fn post<B, R>(&self, url: &str, headers: &[(&str, String)], body: &B) -> Result<R, String>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                debug!("Retrying {} in {:?} (attempt {})", url, delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(*name, value);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<R>()
                            .await
                            .map_err(|e| format!("Invalid response from {}: {}", url, e));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(format!("API error {}: {}", status, body_text));
                        continue;
                    }

                    return Err(format!("API error {}: {}", status, body_text));
                }
                Err(e) => {
                    last_err = Some(format!("Request to {} failed: {}", url, e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| format!("Request to {} failed after retries", url)))
    }
}

/// Exponential backoff for the given retry attempt (1-based).
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}
