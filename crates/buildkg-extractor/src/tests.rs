//! End-to-end tests for the online pipeline

#[cfg(test)]
mod tests {
    use crate::{Extractor, ExtractorConfig, ExtractorError, PromptBuilder, ProvisionIdExtractor};
    use buildkg_domain::{Fragment, FragmentQuery, FragmentSource, RunStats};
    use buildkg_graph::{GraphConfig, GraphLoader, MemoryGraphStore};
    use buildkg_llm::MockProvider;
    use buildkg_profile::{DomainProfile, NodeDef, OntologyConfig};
    use std::fmt;

    #[derive(Debug)]
    struct SourceDown;

    impl fmt::Display for SourceDown {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("source unavailable")
        }
    }

    impl std::error::Error for SourceDown {}

    struct VecSource {
        fragments: Vec<Fragment>,
        down: bool,
    }

    impl FragmentSource for VecSource {
        type Error = SourceDown;

        async fn fetch(&self, query: &FragmentQuery) -> Result<Vec<Fragment>, SourceDown> {
            if self.down {
                return Err(SourceDown);
            }
            Ok(self
                .fragments
                .iter()
                .filter(|f| query.accepts(f))
                .skip(query.offset)
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect())
        }
    }

    fn excerpt(tag: &str) -> String {
        format!("{} {}", tag, "regulatory text ".repeat(5))
    }

    fn profile() -> DomainProfile {
        let mut profile = DomainProfile::named("test");
        profile.ontology = OntologyConfig {
            nodes: vec![
                NodeDef {
                    label: "Provision".to_string(),
                    ..Default::default()
                },
                NodeDef {
                    label: "Requirement".to_string(),
                    ..Default::default()
                },
            ],
            root_node: "Provision".to_string(),
            json_schema: Some(r#"{"entities": [], "relationships": []}"#.to_string()),
            ..Default::default()
        };
        profile
    }

    fn build(provider: MockProvider, batch_size: usize) -> Extractor<MockProvider, MemoryGraphStore> {
        let profile = profile();
        let prompts = PromptBuilder::for_profile(&profile, None).unwrap();
        let loader = GraphLoader::new(prompts.root_node(), &GraphConfig::default());
        let config = ExtractorConfig {
            batch_size,
            ..ExtractorConfig::unthrottled()
        };
        Extractor::new(provider, MemoryGraphStore::new(), prompts, loader, config)
    }

    fn scripted_provider() -> MockProvider {
        let mut provider = MockProvider::new(r#"{"entities": [], "relationships": []}"#);
        provider.add_response(
            "ALPHA",
            r#"{
                "entities": [
                    {"_label": "Provision", "id": "B.01.008"},
                    {"_label": "Requirement", "description": "Declare sodium"}
                ],
                "relationships": [{"_label": "DERIVED_FROM", "_from_index": 1, "_to_index": 0}]
            }"#,
        );
        provider.add_response("BRAVO", "I could not find anything useful.");
        provider
    }

    #[tokio::test]
    async fn test_full_run_counts_every_fragment() {
        let source = VecSource {
            fragments: vec![
                Fragment::new("alpha-0001", "doc-a", excerpt("ALPHA")),
                Fragment::new("bravo-0001", "doc-b", excerpt("BRAVO")),
                Fragment::new("charlie-01", "doc-c", excerpt("CHARLIE")),
                Fragment::new("too-short", "doc-d", "short"),
            ],
            down: false,
        };
        let mut extractor = build(scripted_provider(), 2);

        let report = extractor.run(&source, &FragmentQuery::default()).await.unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(
            report.stats,
            RunStats {
                success: 1,
                failed: 1,
                skipped: 1
            }
        );

        let store = extractor.store();
        assert_eq!(store.vertices().len(), 2);
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.count_vertices("Requirement", "Requirement_alpha-00_1"), 1);
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn test_query_paging_is_respected() {
        let source = VecSource {
            fragments: (0..5)
                .map(|n| Fragment::new(format!("frag-{}", n), "doc", excerpt("CHARLIE")))
                .collect(),
            down: false,
        };
        let mut extractor = build(MockProvider::new(r#"{"entities": []}"#), 10);
        let query = FragmentQuery {
            limit: Some(2),
            offset: 1,
            jurisdiction: None,
        };

        let report = extractor.run(&source, &query).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.stats.skipped, 2);
    }

    #[tokio::test]
    async fn test_source_failure_closes_store() {
        let source = VecSource {
            fragments: Vec::new(),
            down: true,
        };
        let mut extractor = build(MockProvider::default(), 10);

        let result = extractor.run(&source, &FragmentQuery::default()).await;
        assert!(matches!(result, Err(ExtractorError::Source(_))));
        assert_eq!(extractor.store().close_count(), 1);
    }

    #[test]
    fn test_provision_id_alongside_llm_extraction() {
        let fragment = Fragment::new("alpha-0001", "doc-a", excerpt("B.01.008.2"))
            .with_locator("B.01.008.2")
            .with_authority("CFIA");
        let ids = ProvisionIdExtractor::from_profile(&profile()).unwrap();
        let id = ids.extract(
            &fragment.excerpt,
            fragment.canonical_locator.as_deref(),
            fragment.authority.as_deref().unwrap_or_default(),
        );
        assert_eq!(id.provision_id, "B.01.008.2");

        let mut extractor = build(scripted_provider(), 1);
        let outcome = tokio_test::block_on(extractor.process_fragment(&fragment));
        assert_eq!(outcome, buildkg_domain::FragmentOutcome::Skipped);
    }
}
