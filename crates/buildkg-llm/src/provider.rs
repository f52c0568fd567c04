//! Provider selection

use std::fmt;
use std::str::FromStr;

use buildkg_domain::{BatchRequest, BatchResult, BatchSnapshot, LlmProvider};

use crate::{AnthropicProvider, LlmError, OpenAiProvider};

/// Supported hosted providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI Chat Completions API
    OpenAi,
}

impl ProviderKind {
    /// Provider name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(format!(
                "Unknown LLM provider '{}' (expected 'anthropic' or 'openai')",
                other
            )),
        }
    }
}

/// A hosted provider chosen once at startup
pub enum Provider {
    /// Anthropic
    Anthropic(AnthropicProvider),
    /// OpenAI
    OpenAi(OpenAiProvider),
}

impl Provider {
    /// Build the provider for `kind`
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        match kind {
            ProviderKind::Anthropic => Provider::Anthropic(AnthropicProvider::new(api_key, model)),
            ProviderKind::OpenAi => Provider::OpenAi(OpenAiProvider::new(api_key, model)),
        }
    }

    /// Which provider this is
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Anthropic(_) => ProviderKind::Anthropic,
            Provider::OpenAi(_) => ProviderKind::OpenAi,
        }
    }
}

impl LlmProvider for Provider {
    type Error = LlmError;

    fn name(&self) -> &str {
        match self {
            Provider::Anthropic(p) => p.name(),
            Provider::OpenAi(p) => p.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Provider::Anthropic(p) => p.model(),
            Provider::OpenAi(p) => p.model(),
        }
    }

    async fn chat_complete(
        &self,
        system_message: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        match self {
            Provider::Anthropic(p) => p.chat_complete(system_message, user_prompt).await,
            Provider::OpenAi(p) => p.chat_complete(system_message, user_prompt).await,
        }
    }

    fn encode_request(&self, request: &BatchRequest) -> Result<String, LlmError> {
        match self {
            Provider::Anthropic(p) => p.encode_request(request),
            Provider::OpenAi(p) => p.encode_request(request),
        }
    }

    async fn submit_batch(&self, lines: &[String]) -> Result<BatchSnapshot, LlmError> {
        match self {
            Provider::Anthropic(p) => p.submit_batch(lines).await,
            Provider::OpenAi(p) => p.submit_batch(lines).await,
        }
    }

    async fn poll_batch(&self, batch_id: &str) -> Result<BatchSnapshot, LlmError> {
        match self {
            Provider::Anthropic(p) => p.poll_batch(batch_id).await,
            Provider::OpenAi(p) => p.poll_batch(batch_id).await,
        }
    }

    async fn fetch_results(&self, batch_id: &str) -> Result<Vec<BatchResult>, LlmError> {
        match self {
            Provider::Anthropic(p) => p.fetch_results(batch_id).await,
            Provider::OpenAi(p) => p.fetch_results(batch_id).await,
        }
    }
}
