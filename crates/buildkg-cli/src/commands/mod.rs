//! Command implementations.

pub mod batch;
pub mod extract_id;
pub mod parse;
pub mod profiles;
pub mod prompt;

pub use self::batch::execute_batch;
pub use self::extract_id::execute_extract_id;
pub use self::parse::execute_parse;
pub use self::profiles::execute_profiles;
pub use self::prompt::execute_prompt;

use crate::cli::{FragmentArgs, OntologyArgs};
use crate::config::Settings;
use crate::error::Result;
use buildkg_domain::{Fragment, FragmentQuery, FragmentSource};
use buildkg_extractor::PromptBuilder;
use buildkg_graph::{GraphConfig, GraphLoader, LoadMode};
use buildkg_profile::{load_ontology, DomainProfile};
use buildkg_store::{JsonlFragmentSource, PgFragmentSource};
use tracing::info;

/// Prompt builder for a profile, with `--ontology` taking precedence.
pub(crate) fn prompt_builder(profile: &DomainProfile, args: &OntologyArgs) -> Result<PromptBuilder> {
    let ontology = match &args.ontology {
        Some(path) => {
            info!("Loading ontology from {}", path.display());
            Some(load_ontology(path)?)
        }
        None => None,
    };
    Ok(PromptBuilder::for_profile(profile, ontology)?)
}

/// Query for the fragment selection flags.
pub(crate) fn fragment_query(args: &FragmentArgs) -> FragmentQuery {
    FragmentQuery {
        limit: args.limit,
        offset: args.offset,
        jurisdiction: args.jurisdiction.clone(),
    }
}

/// Fetch fragments from `--fragments` if given, otherwise from PostgreSQL.
pub(crate) async fn fetch_fragments(
    settings: &Settings,
    args: &FragmentArgs,
    query: &FragmentQuery,
) -> Result<Vec<Fragment>> {
    match &args.fragments {
        Some(path) => Ok(JsonlFragmentSource::new(path).fetch(query).await?),
        None => {
            let source = PgFragmentSource::new(settings.database.connect_options()?);
            let fragments = source.fetch(query).await;
            source.close().await;
            Ok(fragments?)
        }
    }
}

/// Graph loader for the prompt's root node.
pub(crate) fn graph_loader(settings: &Settings, prompts: &PromptBuilder, upsert: bool) -> GraphLoader {
    let mut config: GraphConfig = settings.graph.clone();
    if upsert {
        config.mode = LoadMode::Upsert;
    }
    GraphLoader::new(prompts.root_node(), &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_fragment_query_from_flags() {
        let args = FragmentArgs {
            limit: Some(5),
            offset: 10,
            jurisdiction: Some("CA".to_string()),
            fragments: None,
        };
        let query = fragment_query(&args);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, 10);
        assert_eq!(query.jurisdiction.as_deref(), Some("CA"));
    }

    #[test]
    fn test_upsert_flag_overrides_settings() {
        let profile = buildkg_profile::ProfileStore::new(workspace_domains())
            .load_profile("food-safety")
            .unwrap();
        let prompts = prompt_builder(&profile, &OntologyArgs { ontology: None }).unwrap();

        let settings = Settings::default();
        assert_eq!(graph_loader(&settings, &prompts, false).mode(), LoadMode::Create);
        assert_eq!(graph_loader(&settings, &prompts, true).mode(), LoadMode::Upsert);
    }

    #[test]
    fn test_explicit_ontology_file() {
        let profile = DomainProfile::named("bare");
        let args = OntologyArgs {
            ontology: Some(workspace_root().join("ontologies/software-architecture.yaml")),
        };
        let prompts = prompt_builder(&profile, &args).unwrap();
        assert!(!prompts.ontology().nodes.is_empty());

        let missing = OntologyArgs { ontology: None };
        assert!(prompt_builder(&profile, &missing).is_err());
    }

    fn workspace_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    fn workspace_domains() -> PathBuf {
        workspace_root().join("domains")
    }
}
