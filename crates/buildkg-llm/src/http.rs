//! Shared HTTP plumbing: retry with exponential backoff

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::LlmError;

/// Default timeout for a single HTTP request
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Build a client with the default timeout.
pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send a request, retrying network errors, rate limits and 5xx responses.
///
/// Other 4xx responses fail immediately. `build` is called once per attempt
/// because request bodies cannot be replayed.
pub(crate) async fn send_with_retry<F>(build: F, max_retries: u32) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let max_attempts = max_retries.max(1);
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_attempts {
        match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                match status {
                    StatusCode::TOO_MANY_REQUESTS => {
                        last_error = Some(LlmError::RateLimitExceeded);
                    }
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        return Err(LlmError::Authentication(error_text));
                    }
                    StatusCode::NOT_FOUND => {
                        return Err(LlmError::NotFound(error_text));
                    }
                    s if s.is_client_error() => {
                        return Err(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            s, error_text
                        )));
                    }
                    s => {
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            s, error_text
                        )));
                    }
                }
            }
            Err(e) => {
                last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
            }
        }

        attempts += 1;
        if attempts < max_attempts {
            // 1s, 2s, 4s, ...
            let delay = Duration::from_secs(2u64.pow(attempts - 1));
            if let Some(e) = &last_error {
                warn!("Request attempt {} failed ({}), retrying in {:?}", attempts, e, delay);
            }
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}

/// Read a successful response as JSON.
pub(crate) async fn json_body(response: Response) -> Result<Value, LlmError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// Read a successful response as text.
pub(crate) async fn text_body(response: Response) -> Result<String, LlmError> {
    let text = response
        .text()
        .await
        .map_err(|e| LlmError::Communication(format!("Failed to read body: {}", e)))?;
    debug!("Downloaded {} bytes", text.len());
    Ok(text)
}

/// Read an optional unsigned counter from a JSON object.
pub(crate) fn count(object: &Value, key: &str) -> Option<u64> {
    object.get(key).and_then(Value::as_u64)
}

/// Required string field, or an `InvalidResponse` naming it.
pub(crate) fn required_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, LlmError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::InvalidResponse(format!("missing '{}' in response", key)))
}
