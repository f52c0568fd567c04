//! build-kg LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `buildkg-domain`.
//!
//! # Providers
//!
//! - `AnthropicProvider`: Messages API and Message Batches API
//! - `OpenAiProvider`: Chat Completions API and Batch API
//! - `Provider`: one of the above, chosen at startup from configuration
//! - `MockProvider`: Deterministic mock for testing
//!
//! Every provider normalizes batch statuses to [`BatchStatus`] and batch
//! results to [`BatchResult`], so callers never branch on the provider.
//!
//! # Examples
//!
//! ```
//! use buildkg_llm::MockProvider;
//! use buildkg_domain::LlmProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = MockProvider::new("{\"entities\": []}");
//! let result = provider.chat_complete("system", "user").await.unwrap();
//! assert_eq!(result, "{\"entities\": []}");
//! # }
//! ```

#![warn(missing_docs)]

pub mod anthropic;
mod http;
pub mod openai;
mod provider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use buildkg_domain::{
    BatchRequest, BatchResult, BatchSnapshot, BatchStatus, LlmProvider, RequestCounts,
};
use serde_json::{json, Value};
use thiserror::Error;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::{Provider, ProviderKind};

/// Maximum tokens requested per completion
pub const MAX_TOKENS: u32 = 4096;

/// Sampling temperature for extraction
pub const TEMPERATURE: f64 = 0.1;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Credentials rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model, batch or file not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Results were requested before the batch finished
    #[error("Batch not finished (status: {0})")]
    BatchNotReady(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        LlmError::InvalidResponse(format!("JSON error: {}", e))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct MockBatchState {
    submitted: Vec<String>,
    statuses: VecDeque<BatchStatus>,
    results: Option<Vec<BatchResult>>,
    poll_count: usize,
    batch_count: usize,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// A response is chosen by the first registered key that occurs in the user
/// prompt; the value `"ERROR"` makes the call fail. Batch jobs move through
/// a configurable status sequence, one step per poll, and their results
/// are produced from the submitted prompts with the same response rules.
///
/// # Examples
///
/// ```
/// use buildkg_llm::MockProvider;
/// use buildkg_domain::BatchStatus;
///
/// let mut provider = MockProvider::new("{\"entities\": []}")
///     .with_statuses(vec![BatchStatus::Processing, BatchStatus::Completed]);
/// provider.add_response("B.01.008", "{\"entities\": [{\"_label\": \"Provision\"}]}");
/// provider.add_error("corrupted excerpt");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    call_count: Arc<Mutex<usize>>,
    batch: Arc<Mutex<MockBatchState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            batch: Arc::new(Mutex::new(MockBatchState {
                submitted: Vec::new(),
                statuses: VecDeque::from([BatchStatus::Completed]),
                results: None,
                poll_count: 0,
                batch_count: 0,
            })),
        }
    }

    /// Statuses reported by successive polls; the last one repeats.
    pub fn with_statuses(self, statuses: Vec<BatchStatus>) -> Self {
        if !statuses.is_empty() {
            lock(&self.batch).statuses = statuses.into();
        }
        self
    }

    /// Return exactly these results instead of answering submitted prompts
    pub fn with_results(self, results: Vec<BatchResult>) -> Self {
        lock(&self.batch).results = Some(results);
        self
    }

    /// Respond with `response` to any prompt containing `key`
    pub fn add_response(&mut self, key: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((key.into(), response.into()));
    }

    /// Fail any prompt containing `key`
    pub fn add_error(&mut self, key: impl Into<String>) {
        lock(&self.responses).push((key.into(), "ERROR".to_string()));
    }

    /// Get the number of times chat_complete was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }

    /// Number of status polls made so far
    pub fn poll_count(&self) -> usize {
        lock(&self.batch).poll_count
    }

    /// Request lines received by the most recent submission
    pub fn submitted_lines(&self) -> Vec<String> {
        lock(&self.batch).submitted.clone()
    }

    fn respond(&self, user_prompt: &str) -> Result<String, LlmError> {
        let responses = lock(&self.responses);
        match responses.iter().find(|(key, _)| user_prompt.contains(key.as_str())) {
            Some((_, response)) if response == "ERROR" => {
                Err(LlmError::Other("Mock error".to_string()))
            }
            Some((_, response)) => Ok(response.clone()),
            None => Ok(self.default_response.clone()),
        }
    }

    fn snapshot(&self, batch_id: &str, status: BatchStatus, total: usize) -> BatchSnapshot {
        BatchSnapshot {
            batch_id: batch_id.to_string(),
            status,
            provider_status: status.as_str().to_string(),
            counts: RequestCounts {
                total: Some(total as u64),
                ..Default::default()
            },
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn chat_complete(
        &self,
        _system_message: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        *lock(&self.call_count) += 1;
        self.respond(user_prompt)
    }

    fn encode_request(&self, request: &BatchRequest) -> Result<String, LlmError> {
        Ok(json!({
            "custom_id": request.custom_id,
            "system": request.system_message,
            "user": request.user_prompt,
        })
        .to_string())
    }

    async fn submit_batch(&self, lines: &[String]) -> Result<BatchSnapshot, LlmError> {
        let mut state = lock(&self.batch);
        state.batch_count += 1;
        state.submitted = lines.to_vec();
        let batch_id = format!("mock_batch_{}", state.batch_count);
        Ok(self.snapshot(&batch_id, BatchStatus::Validating, lines.len()))
    }

    async fn poll_batch(&self, batch_id: &str) -> Result<BatchSnapshot, LlmError> {
        let mut state = lock(&self.batch);
        state.poll_count += 1;
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().copied()
        }
        .unwrap_or(BatchStatus::Completed);
        Ok(self.snapshot(batch_id, status, state.submitted.len()))
    }

    async fn fetch_results(&self, _batch_id: &str) -> Result<Vec<BatchResult>, LlmError> {
        let (results, submitted, status) = {
            let state = lock(&self.batch);
            (
                state.results.clone(),
                state.submitted.clone(),
                state.statuses.back().copied().unwrap_or(BatchStatus::Completed),
            )
        };
        if !status.is_terminal() {
            return Err(LlmError::BatchNotReady(status.to_string()));
        }
        if let Some(results) = results {
            return Ok(results);
        }

        submitted
            .iter()
            .map(|line| {
                let request: Value = serde_json::from_str(line)?;
                let custom_id = request["custom_id"].as_str().unwrap_or_default().to_string();
                let user = request["user"].as_str().unwrap_or_default();
                Ok(match self.respond(user) {
                    Ok(text) => BatchResult::succeeded(custom_id, text),
                    Err(e) => BatchResult::errored(custom_id, e.to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildkg_domain::BatchOutcome;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.chat_complete("sys", "any prompt").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.chat_complete("", "say hello").await.unwrap(), "world");
        assert_eq!(provider.chat_complete("", "foo!").await.unwrap(), "bar");
        assert_eq!(
            provider.chat_complete("", "unknown").await.unwrap(),
            "Default mock response"
        );
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.chat_complete("", "prompt1").await.unwrap();
        provider.chat_complete("", "prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.chat_complete("", "a bad prompt").await;
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.chat_complete("", "test").await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[tokio::test]
    async fn test_status_sequence_last_repeats() {
        let provider = MockProvider::default().with_statuses(vec![
            BatchStatus::Validating,
            BatchStatus::Processing,
            BatchStatus::Completed,
        ]);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(provider.poll_batch("b").await.unwrap().status);
        }
        assert_eq!(
            seen,
            vec![
                BatchStatus::Validating,
                BatchStatus::Processing,
                BatchStatus::Completed,
                BatchStatus::Completed
            ]
        );
        assert_eq!(provider.poll_count(), 4);
    }

    #[tokio::test]
    async fn test_batch_results_answer_submitted_prompts() {
        let mut provider = MockProvider::new("{\"entities\": []}");
        provider.add_error("broken");

        let lines: Vec<String> = [("f1", "fine text"), ("f2", "broken text")]
            .iter()
            .map(|(id, prompt)| {
                provider
                    .encode_request(&BatchRequest {
                        custom_id: id.to_string(),
                        system_message: "sys".to_string(),
                        user_prompt: prompt.to_string(),
                    })
                    .unwrap()
            })
            .collect();

        let submitted = provider.submit_batch(&lines).await.unwrap();
        assert_eq!(submitted.batch_id, "mock_batch_1");
        assert_eq!(submitted.counts.total, Some(2));

        let results = provider.fetch_results(&submitted.batch_id).await.unwrap();
        assert_eq!(results[0].custom_id, "f1");
        assert!(matches!(results[0].outcome, BatchOutcome::Succeeded(_)));
        assert!(matches!(results[1].outcome, BatchOutcome::Errored(_)));
    }

    #[tokio::test]
    async fn test_fetch_before_terminal_fails() {
        let provider = MockProvider::default().with_statuses(vec![BatchStatus::Processing]);
        assert!(matches!(
            provider.fetch_results("b").await,
            Err(LlmError::BatchNotReady(_))
        ));
    }
}
