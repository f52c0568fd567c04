//! Trait definitions for external interactions
//!
//! These traits define the boundaries between pipeline logic and
//! infrastructure. Implementations live in other crates (buildkg-llm,
//! buildkg-graph, buildkg-store). Methods return `Send` futures so callers can
//! drive them from a tokio runtime.

use std::future::Future;

use crate::{BatchRequest, BatchResult, BatchSnapshot, Fragment, FragmentQuery, GraphMutation};

/// An LLM backend that supports both synchronous chat and asynchronous batches.
///
/// Implemented by the infrastructure layer (buildkg-llm)
pub trait LlmProvider: Send + Sync {
    /// Error type for provider operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Provider name ("anthropic", "openai", ...)
    fn name(&self) -> &str;

    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Send one system + user message pair and return the response text.
    fn chat_complete(
        &self,
        system_message: &str,
        user_prompt: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Encode one request as a line of the provider's batch input format.
    fn encode_request(&self, request: &BatchRequest) -> Result<String, Self::Error>;

    /// Submit previously encoded request lines as a new batch job.
    fn submit_batch(
        &self,
        lines: &[String],
    ) -> impl Future<Output = Result<BatchSnapshot, Self::Error>> + Send;

    /// Fetch the current state of a batch job.
    fn poll_batch(
        &self,
        batch_id: &str,
    ) -> impl Future<Output = Result<BatchSnapshot, Self::Error>> + Send;

    /// Download the normalized per-request results of a finished job.
    fn fetch_results(
        &self,
        batch_id: &str,
    ) -> impl Future<Output = Result<Vec<BatchResult>, Self::Error>> + Send;
}

/// A property graph that accepts [`GraphMutation`]s.
///
/// Implemented by the infrastructure layer (buildkg-graph)
pub trait GraphStore: Send {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply one mutation
    fn execute(
        &mut self,
        mutation: &GraphMutation,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Apply the mutations for one fragment, in order.
    ///
    /// Stores that support transactions override this so a fragment is
    /// written completely or not at all.
    fn apply(
        &mut self,
        mutations: &[GraphMutation],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move {
            for mutation in mutations {
                self.execute(mutation).await?;
            }
            Ok(())
        }
    }

    /// Release any held connection. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A source of fragments.
///
/// Implemented by the infrastructure layer (buildkg-store)
pub trait FragmentSource: Send + Sync {
    /// Error type for source operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch fragments matching the query, in stable source order.
    fn fetch(
        &self,
        query: &FragmentQuery,
    ) -> impl Future<Output = Result<Vec<Fragment>, Self::Error>> + Send;
}
