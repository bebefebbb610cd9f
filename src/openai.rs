//! HTTP plumbing shared by the OpenAI-compatible providers.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error): retry
//! - HTTP 4xx (client error, not 429): fail immediately
//! - Network errors, including timeouts: retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

/// Why a call to the provider did not produce a successful response.
#[derive(Debug)]
pub(crate) enum CallError {
    /// The last attempt hit the client timeout.
    Timeout,
    Failed(String),
}

/// Build the HTTP client used for every request to one provider.
pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Join a configured API base with an endpoint path.
pub(crate) fn endpoint(api_base: &str, path: &str) -> String {
    format!("{}/{}", api_base.trim_end_matches('/'), path)
}

/// POST `body` as JSON, retrying transient failures, and return the first
/// successful response.
pub(crate) async fn post_with_retry<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
    max_retries: u32,
) -> Result<reqwest::Response, CallError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            debug!(attempt, delay_secs = delay.as_secs(), url, "retrying provider call");
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response);
                }

                let body_text = response.text().await.unwrap_or_default();
                let message = format!("API error {}: {}", status, body_text.trim());

                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(CallError::Failed(message));
                    continue;
                }

                return Err(CallError::Failed(message));
            }
            Err(e) if e.is_timeout() => {
                last_err = Some(CallError::Timeout);
            }
            Err(e) => {
                last_err = Some(CallError::Failed(e.to_string()));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| CallError::Failed("request failed after retries".to_string())))
}
