//! Parse command implementation (online extraction).

use crate::cli::ParseArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::output::Formatter;
use buildkg_domain::LlmProvider;
use buildkg_extractor::Extractor;
use buildkg_graph::AgeGraphStore;
use buildkg_profile::ProfileResolver;
use buildkg_store::{JsonlFragmentSource, PgFragmentSource};

use super::{fragment_query, graph_loader, prompt_builder};

/// Fragment limit for `--test` runs
const TEST_LIMIT: usize = 5;

/// Extract fragments one request at a time and load each into the graph.
pub async fn execute_parse(
    args: ParseArgs,
    settings: &Settings,
    resolver: &mut ProfileResolver,
    formatter: &Formatter,
) -> Result<()> {
    settings.validate()?;
    let profile = resolver.get()?;
    let prompts = prompt_builder(&profile, &args.ontology)?;
    let loader = graph_loader(settings, &prompts, args.upsert);

    let mut query = fragment_query(&args.selection);
    if args.test {
        query.limit = Some(TEST_LIMIT);
    }

    let provider = settings.provider()?;
    println!("{}", formatter.header("Online Extraction"));
    println!("Domain: {}", profile.name);
    println!("Provider: {} ({})", provider.name(), provider.model());
    println!("Graph: {} ({:?} mode)", settings.graph.graph_name, loader.mode());
    if let Some(jurisdiction) = &query.jurisdiction {
        println!("Jurisdiction filter: {}", jurisdiction);
    }

    let mut store = AgeGraphStore::new(
        settings.database.connect_options()?,
        settings.graph.graph_name.clone(),
    );
    store.ensure_graph().await?;

    let mut extractor = Extractor::new(
        provider,
        store,
        prompts,
        loader,
        settings.extractor.clone(),
    );

    let report = match &args.selection.fragments {
        Some(path) => extractor.run(&JsonlFragmentSource::new(path), &query).await?,
        None => {
            let source = PgFragmentSource::new(settings.database.connect_options()?);
            let report = extractor.run(&source, &query).await;
            source.close().await;
            report?
        }
    };

    if report.processed == 0 {
        println!("{}", formatter.warning("No fragments to process"));
        return Ok(());
    }

    println!("{}", formatter.header("Extraction complete"));
    println!("{}", formatter.stats(&report.stats));
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if let Some(avg) = report.avg_per_fragment() {
        println!("Average per fragment: {:.2}s", avg.as_secs_f64());
    }
    Ok(())
}
