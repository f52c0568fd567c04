//! Batch lifecycle: prepare, submit, status, process

use std::fs;
use std::path::{Path, PathBuf};

use buildkg_domain::{
    BatchOutcome, BatchRequest, BatchResult, BatchSnapshot, BatchStatus, Fragment,
    FragmentOutcome, GraphStore, LlmProvider, RunStats,
};
use buildkg_extractor::{load_response, PromptBuilder};
use buildkg_graph::GraphLoader;
use tracing::{debug, info, warn};

use crate::artifacts::{
    self, find_metadata, info_path, metadata_path, read_json, results_path, unix_now,
    BatchInfo, BatchMetadata, UNKNOWN_DOC_ID,
};
use crate::config::BatchConfig;
use crate::error::BatchError;

/// Artifacts written by [`BatchController::prepare`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBatch {
    /// Request manifest
    pub manifest: PathBuf,
    /// Metadata side-car
    pub metadata: PathBuf,
    /// Number of requests in the manifest
    pub request_count: usize,
    /// Always [`BatchStatus::Prepared`]
    pub status: BatchStatus,
}

/// Result of [`BatchController::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedBatch {
    /// State reported by the provider at submission
    pub snapshot: BatchSnapshot,
    /// Info record linking the batch to its manifest
    pub info: PathBuf,
    /// Number of requests submitted
    pub request_count: usize,
}

/// Results of a completed batch, matched to their metadata side-car.
///
/// Returned by [`BatchController::fetch`] and consumed by
/// [`BatchController::load`].
#[derive(Debug, Clone)]
pub struct FetchedBatch {
    /// Provider batch id
    pub batch_id: String,
    /// Normalized results file
    pub results_file: PathBuf,
    /// Metadata side-car that was used
    pub metadata_file: PathBuf,
    /// Side-car contents
    pub metadata: BatchMetadata,
    /// Results in file order
    pub results: Vec<BatchResult>,
}

/// Outcome of [`BatchController::process`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedBatch {
    /// Normalized results file
    pub results: PathBuf,
    /// Metadata side-car that was used
    pub metadata: PathBuf,
    /// Outcome counters
    pub stats: RunStats,
}

/// Drives one provider's batch jobs and keeps their artifacts on disk.
///
/// Stages may run in separate processes; everything `process` needs is
/// recovered from the artifact directory.
pub struct BatchController<P: LlmProvider> {
    provider: P,
    config: BatchConfig,
}

impl<P: LlmProvider> BatchController<P> {
    /// Create a controller
    pub fn new(provider: P, config: BatchConfig) -> Self {
        Self { provider, config }
    }

    /// The provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    fn output_dir(&self) -> Result<&Path, BatchError> {
        let dir = self.config.output_dir.as_path();
        fs::create_dir_all(dir).map_err(|e| BatchError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(dir)
    }

    /// Write a request manifest and its metadata side-car.
    ///
    /// `output` names the manifest inside the output directory. Running
    /// again with the same fragments rewrites an identical manifest.
    pub fn prepare(
        &self,
        fragments: &[Fragment],
        prompts: &PromptBuilder,
        output: &str,
    ) -> Result<PreparedBatch, BatchError> {
        if fragments.is_empty() {
            return Err(BatchError::NoFragments);
        }
        let dir = self.output_dir()?;
        let manifest = dir.join(output);

        info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            "Creating batch file {} for {} fragments",
            manifest.display(),
            fragments.len()
        );

        let lines = fragments
            .iter()
            .map(|fragment| {
                let (system_message, user_prompt) = prompts.build(
                    &fragment.excerpt,
                    fragment.authority.as_deref().unwrap_or_default(),
                    fragment.jurisdiction.as_deref().unwrap_or_default(),
                );
                self.provider
                    .encode_request(&BatchRequest {
                        custom_id: fragment.fragment_id.clone(),
                        system_message,
                        user_prompt,
                    })
                    .map_err(|e| BatchError::Provider(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        artifacts::write_lines(&manifest, &lines)?;
        let metadata = metadata_path(&manifest);
        artifacts::write_json(&metadata, &BatchMetadata::for_fragments(fragments))?;

        info!("Batch file created: {}", manifest.display());
        info!("Metadata saved: {}", metadata.display());

        Ok(PreparedBatch {
            manifest,
            metadata,
            request_count: lines.len(),
            status: BatchStatus::Prepared,
        })
    }

    /// Submit a manifest as one provider batch and record the link back to it.
    pub async fn submit(&self, manifest: &Path) -> Result<SubmittedBatch, BatchError> {
        let lines = artifacts::read_lines(manifest)?;
        if lines.is_empty() {
            return Err(BatchError::NoFragments);
        }
        info!("Submitting {} requests from {}", lines.len(), manifest.display());

        let snapshot = self
            .provider
            .submit_batch(&lines)
            .await
            .map_err(|e| BatchError::Provider(e.to_string()))?;
        info!(
            "Batch created: {} (status: {})",
            snapshot.batch_id, snapshot.provider_status
        );

        let record = BatchInfo {
            batch_id: snapshot.batch_id.clone(),
            provider: self.provider.name().to_string(),
            status: snapshot.provider_status.clone(),
            created_at: unix_now(),
            batch_file: manifest.display().to_string(),
            request_count: lines.len(),
        };
        let info = info_path(self.output_dir()?, &snapshot.batch_id);
        artifacts::write_json(&info, &record)?;
        info!("Batch info saved: {}", info.display());

        Ok(SubmittedBatch {
            snapshot,
            info,
            request_count: lines.len(),
        })
    }

    /// Poll a batch.
    ///
    /// Single-shot mode polls exactly once. Watch mode polls every
    /// `poll_interval` until the status is terminal. `observer` sees every
    /// snapshot.
    pub async fn status<F>(
        &self,
        batch_id: &str,
        watch: bool,
        mut observer: F,
    ) -> Result<BatchSnapshot, BatchError>
    where
        F: FnMut(&BatchSnapshot),
    {
        loop {
            let snapshot = self
                .provider
                .poll_batch(batch_id)
                .await
                .map_err(|e| BatchError::Provider(e.to_string()))?;
            observer(&snapshot);

            if snapshot.status.is_terminal() || !watch {
                return Ok(snapshot);
            }
            info!(
                "Batch {} still {}; checking again in {} seconds",
                batch_id, snapshot.provider_status, self.config.poll_interval_secs
            );
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn ensure_completed(&self, batch_id: &str) -> Result<BatchSnapshot, BatchError> {
        let snapshot = self.status(batch_id, false, |_| {}).await?;
        if snapshot.status != BatchStatus::Completed {
            return Err(BatchError::NotReady {
                batch_id: batch_id.to_string(),
                status: snapshot.provider_status,
            });
        }
        Ok(snapshot)
    }

    async fn fetch_and_save(&self, batch_id: &str) -> Result<(PathBuf, Vec<BatchResult>), BatchError> {
        let results = self
            .provider
            .fetch_results(batch_id)
            .await
            .map_err(|e| BatchError::Provider(e.to_string()))?;
        let path = results_path(self.output_dir()?, batch_id);
        artifacts::write_results(&path, &results)?;
        info!("Results downloaded: {} ({} lines)", path.display(), results.len());
        Ok((path, results))
    }

    /// Download the results of a completed batch.
    pub async fn download(&self, batch_id: &str) -> Result<(PathBuf, Vec<BatchResult>), BatchError> {
        self.ensure_completed(batch_id).await?;
        self.fetch_and_save(batch_id).await
    }

    /// Download a completed batch and resolve its metadata.
    ///
    /// Fails if the batch is not completed or its metadata cannot be found.
    /// Nothing is written to the graph.
    pub async fn fetch(&self, batch_id: &str) -> Result<FetchedBatch, BatchError> {
        self.ensure_completed(batch_id).await?;
        let metadata_file = find_metadata(&self.config.output_dir, batch_id)?;
        info!("Using metadata: {}", metadata_file.display());
        let metadata: BatchMetadata = read_json(&metadata_file)?;

        let (results_file, results) = self.fetch_and_save(batch_id).await?;
        Ok(FetchedBatch {
            batch_id: batch_id.to_string(),
            results_file,
            metadata_file,
            metadata,
            results,
        })
    }

    /// Load fetched results into the graph, then close the store.
    pub async fn load<G: GraphStore>(
        &self,
        fetched: FetchedBatch,
        loader: &GraphLoader,
        store: &mut G,
    ) -> ProcessedBatch {
        let stats = process_results(&fetched.results, &fetched.metadata, loader, store).await;
        close_store(store).await;
        info!("Batch {} processed: {}", fetched.batch_id, stats);

        ProcessedBatch {
            results: fetched.results_file,
            metadata: fetched.metadata_file,
            stats,
        }
    }

    /// Download a completed batch and load every result into the graph.
    ///
    /// Fails before touching the graph if the batch is not completed or its
    /// metadata cannot be found. The store is closed on every path.
    pub async fn process<G: GraphStore>(
        &self,
        batch_id: &str,
        loader: &GraphLoader,
        store: &mut G,
    ) -> Result<ProcessedBatch, BatchError> {
        match self.fetch(batch_id).await {
            Ok(fetched) => Ok(self.load(fetched, loader, store).await),
            Err(e) => {
                close_store(store).await;
                Err(e)
            }
        }
    }
}

/// Close a graph store, logging any failure.
pub async fn close_store<G: GraphStore>(store: &mut G) {
    if let Err(e) = store.close().await {
        warn!("Failed to close graph store: {}", e);
    }
}

/// Load batch results in order, counting each one.
///
/// Provider errors and unparseable responses count as failed; missing
/// content and empty entity lists count as skipped.
pub async fn process_results<G: GraphStore>(
    results: &[BatchResult],
    metadata: &BatchMetadata,
    loader: &GraphLoader,
    store: &mut G,
) -> RunStats {
    let lookup = metadata.lookup();
    let mut stats = RunStats::default();

    for result in results {
        let fragment_id = result.custom_id.as_str();
        let outcome = match &result.outcome {
            BatchOutcome::Errored(error) => {
                warn!("Error for {}: {}", fragment_id, error);
                FragmentOutcome::Failed
            }
            BatchOutcome::Missing(reason) => {
                info!("No response for {}: {}", fragment_id, reason);
                FragmentOutcome::Skipped
            }
            BatchOutcome::Succeeded(text) => {
                let doc_id = match lookup.get(fragment_id) {
                    Some(record) => record.doc_id.as_str(),
                    None => {
                        debug!("Fragment {} missing from metadata", fragment_id);
                        UNKNOWN_DOC_ID
                    }
                };
                load_response(loader, store, fragment_id, doc_id, text).await
            }
        };
        stats.record(outcome);

        if outcome == FragmentOutcome::Success && stats.success % 100 == 0 {
            info!("Loaded {} fragments so far", stats.success);
        }
    }

    stats
}
