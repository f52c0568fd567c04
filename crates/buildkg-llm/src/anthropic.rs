//! Anthropic Messages and Message Batches API
//!
//! # Examples
//!
//! ```no_run
//! use buildkg_llm::AnthropicProvider;
//!
//! let provider = AnthropicProvider::new("sk-ant-...", "claude-haiku-4-5-20251001");
//! ```

use buildkg_domain::{
    BatchRequest, BatchResult, BatchSnapshot, BatchStatus, LlmProvider, RequestCounts,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::http::{
    build_client, count, json_body, required_str, send_with_retry, text_body,
    DEFAULT_MAX_RETRIES,
};
use crate::{LlmError, MAX_TOKENS, TEMPERATURE};

/// Default Anthropic API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

const API_VERSION: &str = "2023-06-01";

/// Anthropic provider
pub struct AnthropicProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl AnthropicProvider {
    /// Create a provider against the public API
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: build_client(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Use a different API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the maximum number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
    }

    fn post(&self, url: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
    }

    /// Request parameters shared by direct and batch calls
    fn message_params(&self, system_message: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system_message,
            "messages": [{"role": "user", "content": user_prompt}],
            "temperature": TEMPERATURE,
        })
    }

    async fn retrieve(&self, batch_id: &str) -> Result<Value, LlmError> {
        let url = format!("{}/v1/messages/batches/{}", self.endpoint, batch_id);
        let response = send_with_retry(|| self.get(&url), self.max_retries).await?;
        json_body(response).await
    }
}

/// Text of the first content block of a message
fn message_text(message: &Value) -> Option<&str> {
    message
        .get("content")
        .and_then(|content| content.get(0))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
}

/// Normalize a Message Batch object
pub(crate) fn parse_batch(batch: &Value) -> Result<BatchSnapshot, LlmError> {
    let batch_id = required_str(batch, "id")?.to_string();
    let provider_status = required_str(batch, "processing_status")?.to_string();
    let cancelled = batch
        .get("cancel_initiated_at")
        .is_some_and(|v| !v.is_null());

    let status = match provider_status.as_str() {
        "ended" if cancelled => BatchStatus::Cancelled,
        "ended" => BatchStatus::Completed,
        "in_progress" | "canceling" => BatchStatus::Processing,
        other => {
            return Err(LlmError::InvalidResponse(format!(
                "unknown processing_status '{}'",
                other
            )))
        }
    };

    let counts = batch.get("request_counts").cloned().unwrap_or(Value::Null);
    Ok(BatchSnapshot {
        batch_id,
        status,
        provider_status,
        counts: RequestCounts {
            processing: count(&counts, "processing"),
            succeeded: count(&counts, "succeeded"),
            errored: count(&counts, "errored"),
            canceled: count(&counts, "canceled"),
            expired: count(&counts, "expired"),
            ..Default::default()
        },
    })
}

/// Normalize one line of a results file
pub(crate) fn parse_result_line(line: &str) -> Result<BatchResult, LlmError> {
    let value: Value = serde_json::from_str(line)?;
    let custom_id = required_str(&value, "custom_id")?.to_string();
    let result = value.get("result").cloned().unwrap_or(Value::Null);

    Ok(match result.get("type").and_then(Value::as_str) {
        Some("succeeded") => match result.get("message").and_then(message_text) {
            Some(text) => BatchResult::succeeded(custom_id, text),
            None => BatchResult::missing(custom_id, "no text content in message"),
        },
        Some("errored") => {
            let message = result
                .pointer("/error/error/message")
                .or_else(|| result.pointer("/error/message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            BatchResult::errored(custom_id, message)
        }
        Some(other) => BatchResult::errored(custom_id, format!("request {}", other)),
        None => BatchResult::errored(custom_id, "result has no type"),
    })
}

impl LlmProvider for AnthropicProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_complete(
        &self,
        system_message: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.endpoint);
        let body = self.message_params(system_message, user_prompt);
        let response = send_with_retry(|| self.post(&url, &body), self.max_retries).await?;
        let value = json_body(response).await?;
        message_text(&value)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("no text content in message".to_string()))
    }

    fn encode_request(&self, request: &BatchRequest) -> Result<String, LlmError> {
        let line = json!({
            "custom_id": request.custom_id,
            "params": self.message_params(&request.system_message, &request.user_prompt),
        });
        Ok(line.to_string())
    }

    async fn submit_batch(&self, lines: &[String]) -> Result<BatchSnapshot, LlmError> {
        let requests = lines
            .iter()
            .map(|line| serde_json::from_str::<Value>(line))
            .collect::<Result<Vec<_>, _>>()?;
        let body = json!({ "requests": requests });
        let url = format!("{}/v1/messages/batches", self.endpoint);

        info!("Submitting {} requests to Anthropic", lines.len());
        let response = send_with_retry(|| self.post(&url, &body), self.max_retries).await?;
        parse_batch(&json_body(response).await?)
    }

    async fn poll_batch(&self, batch_id: &str) -> Result<BatchSnapshot, LlmError> {
        parse_batch(&self.retrieve(batch_id).await?)
    }

    async fn fetch_results(&self, batch_id: &str) -> Result<Vec<BatchResult>, LlmError> {
        let batch = self.retrieve(batch_id).await?;
        let snapshot = parse_batch(&batch)?;
        if !snapshot.status.is_terminal() {
            return Err(LlmError::BatchNotReady(snapshot.provider_status));
        }
        let results_url = required_str(&batch, "results_url")?.to_string();

        let response = send_with_retry(|| self.get(&results_url), self.max_retries).await?;
        let text = text_body(response).await?;
        let results = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_result_line)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Batch {} returned {} results", batch_id, results.len());
        Ok(results)
    }
}
