//! Batch command implementation.

use crate::cli::{BatchAction, BatchArgs, FragmentArgs, OntologyArgs};
use crate::config::Settings;
use crate::error::Result;
use crate::output::Formatter;
use buildkg_batch::{close_store, BatchController};
use buildkg_domain::{BatchStatus, LlmProvider};
use buildkg_graph::AgeGraphStore;
use buildkg_profile::ProfileResolver;
use std::path::Path;

use super::{fetch_fragments, fragment_query, graph_loader, prompt_builder};

/// Execute a batch lifecycle stage.
pub async fn execute_batch(
    args: BatchArgs,
    settings: &Settings,
    resolver: &mut ProfileResolver,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        BatchAction::Prepare {
            ontology,
            selection,
            output,
        } => prepare(settings, resolver, &ontology, &selection, &output, formatter).await,
        BatchAction::Submit { manifest } => submit(settings, &manifest, formatter).await,
        BatchAction::Status { batch_id, watch } => {
            status(settings, &batch_id, watch, formatter).await
        }
        BatchAction::Process {
            batch_id,
            ontology,
            upsert,
        } => process(settings, resolver, &batch_id, &ontology, upsert, formatter).await,
    }
}

/// Step 1: write the request manifest and metadata.
async fn prepare(
    settings: &Settings,
    resolver: &mut ProfileResolver,
    ontology: &OntologyArgs,
    selection: &FragmentArgs,
    output: &str,
    formatter: &Formatter,
) -> Result<()> {
    settings.require(true, selection.fragments.is_none())?;
    let profile = resolver.get()?;
    let prompts = prompt_builder(&profile, ontology)?;
    let query = fragment_query(selection);

    println!("{}", formatter.header("Batch Preparation - Step 1"));
    println!("Domain: {}", profile.name);
    if let Some(jurisdiction) = &query.jurisdiction {
        println!("Jurisdiction filter: {}", jurisdiction);
    }

    let fragments = fetch_fragments(settings, selection, &query).await?;
    println!("Found {} fragments", fragments.len());
    if fragments.is_empty() {
        println!("{}", formatter.warning("No fragments to process"));
        return Ok(());
    }

    let controller = BatchController::new(settings.provider()?, settings.batch.clone());
    println!(
        "Provider: {}, Model: {}",
        controller.provider().name(),
        controller.provider().model()
    );
    let prepared = controller.prepare(&fragments, &prompts, output)?;

    println!(
        "{}",
        formatter.success(&format!(
            "Batch file created: {} ({} requests)",
            prepared.manifest.display(),
            prepared.request_count
        ))
    );
    println!(
        "{}",
        formatter.success(&format!("Metadata saved: {}", prepared.metadata.display()))
    );
    println!(
        "{}",
        formatter.info(&format!(
            "Next step: build-kg batch submit {}",
            prepared.manifest.display()
        ))
    );
    Ok(())
}

/// Step 2: submit the manifest.
async fn submit(settings: &Settings, manifest: &Path, formatter: &Formatter) -> Result<()> {
    settings.require(true, false)?;
    let controller = BatchController::new(settings.provider()?, settings.batch.clone());

    println!("{}", formatter.header("Batch Submission - Step 2"));
    println!("Provider: {}", controller.provider().name());
    println!("Processing file: {}", manifest.display());

    let submitted = controller.submit(manifest).await?;

    println!(
        "{}",
        formatter.success(&format!("Batch created: {}", submitted.snapshot.batch_id))
    );
    println!("{}", formatter.snapshot(&submitted.snapshot));
    println!(
        "{}",
        formatter.success(&format!("Batch info saved: {}", submitted.info.display()))
    );
    println!(
        "{}",
        formatter.info(&format!(
            "Monitor progress: build-kg batch status {}",
            submitted.snapshot.batch_id
        ))
    );
    Ok(())
}

/// Step 3: poll once, or until the batch finishes.
async fn status(settings: &Settings, batch_id: &str, watch: bool, formatter: &Formatter) -> Result<()> {
    settings.require(true, false)?;
    let controller = BatchController::new(settings.provider()?, settings.batch.clone());

    println!("{}", formatter.header("Batch Status - Step 3"));
    println!("Provider: {}", controller.provider().name());

    let snapshot = controller
        .status(batch_id, watch, |snapshot| {
            println!("{}", formatter.snapshot(snapshot));
            if watch && !snapshot.status.is_terminal() {
                println!(
                    "Still processing... (will check again in {} seconds)",
                    settings.batch.poll_interval_secs
                );
            }
        })
        .await?;

    match snapshot.status {
        BatchStatus::Completed => {
            println!("{}", formatter.success("Batch completed!"));
            println!(
                "{}",
                formatter.info(&format!("Next step: build-kg batch process {}", batch_id))
            );
        }
        status if status.is_terminal() => {
            println!("{}", formatter.error(&format!("Batch ended with status {}", status)));
        }
        _ => {
            println!(
                "{}",
                formatter.info(&format!(
                    "Not finished yet; run build-kg batch status {} --watch to wait",
                    batch_id
                ))
            );
        }
    }
    Ok(())
}

/// Step 4: download results and load the graph.
async fn process(
    settings: &Settings,
    resolver: &mut ProfileResolver,
    batch_id: &str,
    ontology: &OntologyArgs,
    upsert: bool,
    formatter: &Formatter,
) -> Result<()> {
    settings.validate()?;
    let profile = resolver.get()?;
    let prompts = prompt_builder(&profile, ontology)?;
    let loader = graph_loader(settings, &prompts, upsert);
    let controller = BatchController::new(settings.provider()?, settings.batch.clone());

    println!("{}", formatter.header("Batch Processing - Step 4"));
    println!("Batch ID: {}", batch_id);
    println!("Graph: {} ({:?} mode)", settings.graph.graph_name, loader.mode());

    let fetched = controller.fetch(batch_id).await?;
    println!(
        "Using metadata: {} ({} results)",
        fetched.metadata_file.display(),
        fetched.results.len()
    );

    let mut store = AgeGraphStore::new(
        settings.database.connect_options()?,
        settings.graph.graph_name.clone(),
    );
    if let Err(e) = store.ensure_graph().await {
        close_store(&mut store).await;
        return Err(e.into());
    }

    let processed = controller.load(fetched, &loader, &mut store).await;

    println!(
        "{}",
        formatter.success(&format!("Results saved: {}", processed.results.display()))
    );
    println!("{}", formatter.header("Batch processing complete"));
    println!("{}", formatter.stats(&processed.stats));
    Ok(())
}
