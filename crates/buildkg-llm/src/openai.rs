//! OpenAI Chat Completions and Batch API
//!
//! # Examples
//!
//! ```no_run
//! use buildkg_llm::OpenAiProvider;
//!
//! let provider = OpenAiProvider::new("sk-...", "gpt-4o-mini");
//! ```

use buildkg_domain::{
    BatchRequest, BatchResult, BatchSnapshot, BatchStatus, LlmProvider, RequestCounts,
};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::http::{
    build_client, count, json_body, required_str, send_with_retry, text_body,
    DEFAULT_MAX_RETRIES,
};
use crate::{LlmError, TEMPERATURE};

/// Default OpenAI API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI provider
pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAiProvider {
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

    fn chat_body(&self, system_message: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_message},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
            "temperature": TEMPERATURE,
        })
    }

    async fn retrieve(&self, batch_id: &str) -> Result<Value, LlmError> {
        let url = format!("{}/v1/batches/{}", self.endpoint, batch_id);
        let response = send_with_retry(
            || self.client.get(&url).bearer_auth(&self.api_key),
            self.max_retries,
        )
        .await?;
        json_body(response).await
    }

    async fn download_file(&self, file_id: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/files/{}/content", self.endpoint, file_id);
        let response = send_with_retry(
            || self.client.get(&url).bearer_auth(&self.api_key),
            self.max_retries,
        )
        .await?;
        text_body(response).await
    }

    async fn upload_batch_file(&self, lines: &[String]) -> Result<String, LlmError> {
        let mut content = lines.join("\n");
        content.push('\n');
        let url = format!("{}/v1/files", self.endpoint);
        let response = send_with_retry(
            || {
                let part = Part::bytes(content.clone().into_bytes())
                    .file_name("batch_requests.jsonl");
                let form = Form::new().text("purpose", "batch").part("file", part);
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .multipart(form)
            },
            self.max_retries,
        )
        .await?;
        let file = json_body(response).await?;
        Ok(required_str(&file, "id")?.to_string())
    }
}

fn chat_text(body: &Value) -> Option<&str> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
}

/// Normalize a Batch object
pub(crate) fn parse_batch(batch: &Value) -> Result<BatchSnapshot, LlmError> {
    let batch_id = required_str(batch, "id")?.to_string();
    let provider_status = required_str(batch, "status")?.to_string();

    let status = match provider_status.as_str() {
        "validating" => BatchStatus::Validating,
        "in_progress" | "finalizing" | "cancelling" => BatchStatus::Processing,
        "completed" => BatchStatus::Completed,
        "failed" => BatchStatus::Failed,
        "expired" => BatchStatus::Expired,
        "cancelled" => BatchStatus::Cancelled,
        other => {
            return Err(LlmError::InvalidResponse(format!(
                "unknown batch status '{}'",
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
            total: count(&counts, "total"),
            completed: count(&counts, "completed"),
            failed: count(&counts, "failed"),
            ..Default::default()
        },
    })
}

/// Normalize one line of an output or error file
pub(crate) fn parse_result_line(line: &str) -> Result<BatchResult, LlmError> {
    let value: Value = serde_json::from_str(line)?;
    let custom_id = required_str(&value, "custom_id")?.to_string();

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Ok(BatchResult::errored(custom_id, message));
    }

    let response = value.get("response").cloned().unwrap_or(Value::Null);
    let status_code = response.get("status_code").and_then(Value::as_u64);
    if let Some(code) = status_code.filter(|code| *code != 200) {
        let message = response
            .pointer("/body/error/message")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        return Ok(BatchResult::errored(
            custom_id,
            format!("HTTP {}: {}", code, message),
        ));
    }

    Ok(match response.get("body").and_then(chat_text) {
        Some(text) => BatchResult::succeeded(custom_id, text),
        None => BatchResult::missing(custom_id, "no message content in response"),
    })
}

fn parse_result_file(text: &str) -> Result<Vec<BatchResult>, LlmError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_result_line)
        .collect()
}

impl LlmProvider for OpenAiProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_complete(
        &self,
        system_message: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let url = format!("{}{}", self.endpoint, CHAT_COMPLETIONS_PATH);
        let body = self.chat_body(system_message, user_prompt);
        let response = send_with_retry(
            || self.client.post(&url).bearer_auth(&self.api_key).json(&body),
            self.max_retries,
        )
        .await?;
        let value = json_body(response).await?;
        chat_text(&value)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("no message content in response".to_string()))
    }

    fn encode_request(&self, request: &BatchRequest) -> Result<String, LlmError> {
        let line = json!({
            "custom_id": request.custom_id,
            "method": "POST",
            "url": CHAT_COMPLETIONS_PATH,
            "body": self.chat_body(&request.system_message, &request.user_prompt),
        });
        Ok(line.to_string())
    }

    async fn submit_batch(&self, lines: &[String]) -> Result<BatchSnapshot, LlmError> {
        info!("Uploading {} requests to OpenAI", lines.len());
        let input_file_id = self.upload_batch_file(lines).await?;
        debug!("Uploaded batch input file {}", input_file_id);

        let url = format!("{}/v1/batches", self.endpoint);
        let body = json!({
            "input_file_id": input_file_id,
            "endpoint": CHAT_COMPLETIONS_PATH,
            "completion_window": "24h",
            "metadata": {"description": "build-kg extraction batch"},
        });
        let response = send_with_retry(
            || self.client.post(&url).bearer_auth(&self.api_key).json(&body),
            self.max_retries,
        )
        .await?;
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

        let mut results = Vec::new();
        if let Some(output_file_id) = batch.get("output_file_id").and_then(Value::as_str) {
            results.extend(parse_result_file(&self.download_file(output_file_id).await?)?);
        }
        if let Some(error_file_id) = batch.get("error_file_id").and_then(Value::as_str) {
            let errors = parse_result_file(&self.download_file(error_file_id).await?)?;
            warn!("Batch {} reported {} failed requests", batch_id, errors.len());
            results.extend(errors);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildkg_domain::BatchOutcome;

    #[test]
    fn test_encode_request_shape() {
        let provider = OpenAiProvider::new("key", "gpt-test");
        let line = provider
            .encode_request(&BatchRequest {
                custom_id: "frag-1".to_string(),
                system_message: "sys".to_string(),
                user_prompt: "user".to_string(),
            })
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["custom_id"], "frag-1");
        assert_eq!(value["method"], "POST");
        assert_eq!(value["url"], "/v1/chat/completions");
        assert_eq!(value["body"]["model"], "gpt-test");
        assert_eq!(value["body"]["messages"][0]["role"], "system");
        assert_eq!(value["body"]["messages"][1]["content"], "user");
        assert_eq!(value["body"]["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_parse_batch_statuses() {
        let cases = [
            ("validating", BatchStatus::Validating),
            ("in_progress", BatchStatus::Processing),
            ("finalizing", BatchStatus::Processing),
            ("completed", BatchStatus::Completed),
            ("failed", BatchStatus::Failed),
            ("expired", BatchStatus::Expired),
            ("cancelled", BatchStatus::Cancelled),
        ];
        for (raw, expected) in cases {
            let snapshot = parse_batch(&json!({"id": "batch_1", "status": raw})).unwrap();
            assert_eq!(snapshot.status, expected, "{}", raw);
            assert_eq!(snapshot.provider_status, raw);
        }
        assert!(parse_batch(&json!({"id": "batch_1", "status": "paused"})).is_err());
    }

    #[test]
    fn test_parse_batch_counts() {
        let snapshot = parse_batch(&json!({
            "id": "batch_1",
            "status": "in_progress",
            "request_counts": {"total": 10, "completed": 4, "failed": 1}
        }))
        .unwrap();
        assert_eq!(
            snapshot.counts.entries(),
            vec![("total", 10), ("completed", 4), ("failed", 1)]
        );
    }

    #[test]
    fn test_parse_result_lines() {
        let ok = parse_result_line(
            r#"{"id":"r1","custom_id":"a","response":{"status_code":200,"body":{"choices":[{"message":{"content":"{}"}}]}},"error":null}"#,
        )
        .unwrap();
        assert_eq!(ok.outcome, BatchOutcome::Succeeded("{}".to_string()));

        let failed = parse_result_line(
            r#"{"id":"r2","custom_id":"b","response":null,"error":{"code":"server_error","message":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(failed.outcome, BatchOutcome::Errored("boom".to_string()));

        let http = parse_result_line(
            r#"{"id":"r3","custom_id":"c","response":{"status_code":400,"body":{"error":{"message":"bad"}}},"error":null}"#,
        )
        .unwrap();
        assert_eq!(http.outcome, BatchOutcome::Errored("HTTP 400: bad".to_string()));

        let missing = parse_result_line(
            r#"{"id":"r4","custom_id":"d","response":{"status_code":200,"body":{"choices":[]}},"error":null}"#,
        )
        .unwrap();
        assert!(matches!(missing.outcome, BatchOutcome::Missing(_)));
    }
}
