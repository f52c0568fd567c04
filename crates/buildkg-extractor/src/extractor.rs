//! Online (one request per fragment) extraction pipeline

use std::time::{Duration, Instant};

use buildkg_domain::{
    Fragment, FragmentOutcome, FragmentQuery, FragmentSource, GraphStore, LlmProvider, RunStats,
};
use buildkg_graph::GraphLoader;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_extraction;
use crate::prompt::PromptBuilder;

/// Parse one response and write it to the graph.
///
/// Unparseable responses and loader failures count as failed; responses
/// without entities count as skipped.
pub async fn load_response<G: GraphStore>(
    loader: &GraphLoader,
    store: &mut G,
    fragment_id: &str,
    doc_id: &str,
    response: &str,
) -> FragmentOutcome {
    let payload = match parse_extraction(response) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Could not parse response for fragment {}: {}", fragment_id, e);
            return FragmentOutcome::Failed;
        }
    };

    if payload.is_empty() {
        info!("No entities found for fragment {}, skipping", fragment_id);
        return FragmentOutcome::Skipped;
    }
    debug!(
        "Extracted {} entities for fragment {}",
        payload.entities.len(),
        fragment_id
    );

    match loader.load(store, fragment_id, doc_id, &payload).await {
        Ok(true) => FragmentOutcome::Success,
        Ok(false) => FragmentOutcome::Skipped,
        Err(e) => {
            warn!("Graph loading failed for fragment {}: {}", fragment_id, e);
            FragmentOutcome::Failed
        }
    }
}

/// Summary of one online run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// Outcome counters
    pub stats: RunStats,
    /// Fragments fetched from the source
    pub processed: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Mean time per fragment, if any were processed
    pub fn avg_per_fragment(&self) -> Option<Duration> {
        u32::try_from(self.processed)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.elapsed / n)
    }
}

/// Sends fragments to the LLM one at a time and loads each result.
pub struct Extractor<P, G>
where
    P: LlmProvider,
    G: GraphStore,
{
    provider: P,
    store: G,
    prompts: PromptBuilder,
    loader: GraphLoader,
    config: ExtractorConfig,
}

impl<P, G> Extractor<P, G>
where
    P: LlmProvider,
    G: GraphStore,
{
    /// Create a new Extractor
    pub fn new(
        provider: P,
        store: G,
        prompts: PromptBuilder,
        loader: GraphLoader,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            prompts,
            loader,
            config,
        }
    }

    /// The graph store
    pub fn store(&self) -> &G {
        &self.store
    }

    /// Consume the extractor and return its graph store
    pub fn into_store(self) -> G {
        self.store
    }

    /// Ask the LLM about one fragment and return the raw response text.
    pub async fn parse_fragment(&self, fragment: &Fragment) -> Result<String, ExtractorError> {
        let (system_message, user_prompt) = self.prompts.build(
            &fragment.excerpt,
            fragment.authority.as_deref().unwrap_or_default(),
            fragment.jurisdiction.as_deref().unwrap_or_default(),
        );
        debug!("Prompt length: {} chars", user_prompt.len());

        let response = timeout(
            self.config.extraction_timeout(),
            self.provider.chat_complete(&system_message, &user_prompt),
        )
        .await
        .map_err(|_| ExtractorError::Timeout)?
        .map_err(|e| ExtractorError::Llm(e.to_string()))?;

        debug!("LLM response length: {} chars", response.len());
        Ok(response)
    }

    /// Extract and load one fragment.
    pub async fn process_fragment(&mut self, fragment: &Fragment) -> FragmentOutcome {
        info!("Processing fragment {}", fragment.fragment_id);
        let response = match self.parse_fragment(fragment).await {
            Ok(response) => response,
            Err(e) => {
                warn!("LLM parsing failed for fragment {}: {}", fragment.fragment_id, e);
                return FragmentOutcome::Failed;
            }
        };
        load_response(
            &self.loader,
            &mut self.store,
            &fragment.fragment_id,
            &fragment.doc_id,
            &response,
        )
        .await
    }

    /// Fetch fragments and process them in chunks of `batch_size`.
    ///
    /// Per-fragment failures are counted, not returned. The store is closed
    /// when the run ends, including when the fetch fails.
    pub async fn run<S: FragmentSource>(
        &mut self,
        source: &S,
        query: &FragmentQuery,
    ) -> Result<RunReport, ExtractorError> {
        let start = Instant::now();
        info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            batch_size = self.config.batch_size,
            "Starting extraction run"
        );

        let fragments = match source.fetch(query).await {
            Ok(fragments) => fragments,
            Err(e) => {
                self.close_store().await;
                return Err(ExtractorError::Source(e.to_string()));
            }
        };
        info!("Found {} fragments to process", fragments.len());

        let batch_size = self.config.batch_size.max(1);
        let total_batches = fragments.len().div_ceil(batch_size);
        let delay = self.config.rate_limit_delay();
        let mut stats = RunStats::default();

        for (idx, chunk) in fragments.chunks(batch_size).enumerate() {
            info!("Batch {}/{}", idx + 1, total_batches);
            let mut chunk_stats = RunStats::default();
            for fragment in chunk {
                let outcome = self.process_fragment(fragment).await;
                chunk_stats.record(outcome);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            info!("Batch complete: {}", chunk_stats);
            stats.merge(chunk_stats);
        }

        self.close_store().await;

        let report = RunReport {
            stats,
            processed: fragments.len(),
            elapsed: start.elapsed(),
        };
        info!(
            "Extraction run complete: {} ({:.1}s)",
            report.stats,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    async fn close_store(&mut self) {
        if let Err(e) = self.store.close().await {
            warn!("Failed to close graph store: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildkg_graph::{GraphConfig, MemoryGraphStore};
    use buildkg_llm::MockProvider;
    use buildkg_profile::{NodeDef, OntologyConfig, ParsingConfig};

    fn prompts() -> PromptBuilder {
        let ontology = OntologyConfig {
            nodes: vec![NodeDef {
                label: "Provision".to_string(),
                ..Default::default()
            }],
            root_node: "Provision".to_string(),
            json_schema: Some("{\"entities\": []}".to_string()),
            ..Default::default()
        };
        PromptBuilder::new(&ParsingConfig::default(), ontology).unwrap()
    }

    fn extractor(provider: MockProvider) -> Extractor<MockProvider, MemoryGraphStore> {
        let loader = GraphLoader::new("Provision", &GraphConfig::default());
        Extractor::new(
            provider,
            MemoryGraphStore::new(),
            prompts(),
            loader,
            ExtractorConfig::unthrottled(),
        )
    }

    #[tokio::test]
    async fn test_process_fragment_loads_entities() {
        let provider =
            MockProvider::new(r#"{"entities": [{"_label": "Provision", "title": "Sodium"}]}"#);
        let mut extractor = extractor(provider);

        let fragment = Fragment::new("abcdef1234", "doc-1", "B.01.008 Sodium labelling rules");
        let outcome = extractor.process_fragment(&fragment).await;

        assert_eq!(outcome, FragmentOutcome::Success);
        assert_eq!(extractor.store().count_vertices("Provision", "Provision_abcdef12_0"), 1);
    }

    #[tokio::test]
    async fn test_empty_entities_are_skipped() {
        let mut extractor = extractor(MockProvider::new(r#"{"entities": []}"#));
        let outcome = extractor
            .process_fragment(&Fragment::new("f1", "d1", "text"))
            .await;
        assert_eq!(outcome, FragmentOutcome::Skipped);
        assert!(extractor.store().vertices().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_is_failed() {
        let mut provider = MockProvider::default();
        provider.add_error("broken");
        let mut extractor = extractor(provider);
        let outcome = extractor
            .process_fragment(&Fragment::new("f1", "d1", "broken text"))
            .await;
        assert_eq!(outcome, FragmentOutcome::Failed);
    }

    #[tokio::test]
    async fn test_prompt_carries_provenance() {
        let mut provider = MockProvider::new(r#"{"entities": []}"#);
        provider.add_response("Source: CFIA (CA)", r#"{"entities": [{"name": "x"}]}"#);
        let mut extractor = extractor(provider);

        let fragment = Fragment::new("f1", "d1", "text")
            .with_authority("CFIA")
            .with_jurisdiction("CA");
        assert_eq!(
            extractor.process_fragment(&fragment).await,
            FragmentOutcome::Success
        );
    }

    #[test]
    fn test_avg_per_fragment() {
        let report = RunReport {
            stats: RunStats::default(),
            processed: 4,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(report.avg_per_fragment(), Some(Duration::from_millis(500)));

        let empty = RunReport { processed: 0, ..report };
        assert_eq!(empty.avg_per_fragment(), None);
    }
}
