//! Durable batch artifacts
//!
//! | File | Written by | Contents |
//! |------|------------|----------|
//! | `{output}` | prepare | one provider request per line |
//! | `{output}.metadata.json` | prepare | fragment provenance |
//! | `batch_{id}.info.json` | submit | batch id to manifest link |
//! | `batch_{id}_results.jsonl` | process | normalized results |
//!
//! `process` finds the metadata through the info record; these names are
//! part of the on-disk contract.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use buildkg_domain::{BatchOutcome, BatchResult, Fragment};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BatchError;

/// Suffix appended to a manifest path to name its metadata side-car
pub const METADATA_SUFFIX: &str = ".metadata.json";

/// doc_id recorded for results whose fragment is missing from the metadata
pub const UNKNOWN_DOC_ID: &str = "UNKNOWN";

/// Metadata side-car of a manifest
pub fn metadata_path(manifest: &Path) -> PathBuf {
    let mut name = manifest.as_os_str().to_owned();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

/// Info record of a submitted batch
pub fn info_path(dir: &Path, batch_id: &str) -> PathBuf {
    dir.join(format!("batch_{}.info.json", batch_id))
}

/// Downloaded results of a batch
pub fn results_path(dir: &Path, batch_id: &str) -> PathBuf {
    dir.join(format!("batch_{}_results.jsonl", batch_id))
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Provenance of one manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Fragment id, also the request's custom id
    pub fragment_id: String,
    /// Parent document
    pub doc_id: String,
    /// Jurisdiction, empty when unknown
    #[serde(default)]
    pub jurisdiction: String,
    /// Authority, empty when unknown
    #[serde(default)]
    pub authority: String,
}

impl From<&Fragment> for MetadataRecord {
    fn from(fragment: &Fragment) -> Self {
        let metadata = fragment.metadata();
        Self {
            fragment_id: metadata.fragment_id,
            doc_id: metadata.doc_id,
            jurisdiction: metadata.jurisdiction.unwrap_or_default(),
            authority: metadata.authority.unwrap_or_default(),
        }
    }
}

/// Contents of `{output}.metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Unix timestamp (seconds)
    pub created_at: u64,
    /// Number of fragments in the manifest
    pub fragment_count: usize,
    /// One record per manifest line, in the same order
    pub fragments: Vec<MetadataRecord>,
}

impl BatchMetadata {
    /// Build the side-car for a set of fragments
    pub fn for_fragments(fragments: &[Fragment]) -> Self {
        Self {
            created_at: unix_now(),
            fragment_count: fragments.len(),
            fragments: fragments.iter().map(MetadataRecord::from).collect(),
        }
    }

    /// Index records by fragment id
    pub fn lookup(&self) -> HashMap<&str, &MetadataRecord> {
        self.fragments
            .iter()
            .map(|record| (record.fragment_id.as_str(), record))
            .collect()
    }
}

/// Contents of `batch_{id}.info.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Provider batch id
    pub batch_id: String,
    /// Provider name
    pub provider: String,
    /// Provider status at submission
    pub status: String,
    /// Unix timestamp (seconds)
    pub created_at: u64,
    /// Manifest that was submitted
    pub batch_file: String,
    /// Number of requests submitted
    pub request_count: usize,
}

/// One line of `batch_{id}_results.jsonl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLine {
    /// Request correlation id
    pub custom_id: String,
    /// What the provider returned
    #[serde(flatten)]
    pub outcome: OutcomeLine,
}

/// Serialized [`BatchOutcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutcomeLine {
    /// Response text
    Succeeded {
        /// Model output
        text: String,
    },
    /// Provider-side error
    Errored {
        /// Error description
        error: String,
    },
    /// Succeeded without usable content
    Missing {
        /// Why no content was found
        reason: String,
    },
}

impl From<&BatchResult> for ResultLine {
    fn from(result: &BatchResult) -> Self {
        let outcome = match &result.outcome {
            BatchOutcome::Succeeded(text) => OutcomeLine::Succeeded { text: text.clone() },
            BatchOutcome::Errored(error) => OutcomeLine::Errored {
                error: error.clone(),
            },
            BatchOutcome::Missing(reason) => OutcomeLine::Missing {
                reason: reason.clone(),
            },
        };
        Self {
            custom_id: result.custom_id.clone(),
            outcome,
        }
    }
}

impl From<ResultLine> for BatchResult {
    fn from(line: ResultLine) -> Self {
        let outcome = match line.outcome {
            OutcomeLine::Succeeded { text } => BatchOutcome::Succeeded(text),
            OutcomeLine::Errored { error } => BatchOutcome::Errored(error),
            OutcomeLine::Missing { reason } => BatchOutcome::Missing(reason),
        };
        BatchResult {
            custom_id: line.custom_id,
            outcome,
        }
    }
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> BatchError {
    BatchError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn invalid(path: &Path, e: impl std::fmt::Display) -> BatchError {
    BatchError::InvalidArtifact {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Write a pretty-printed JSON document
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BatchError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| invalid(path, e))?;
    fs::write(path, text).map_err(|e| io_error(path, e))
}

/// Read a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BatchError> {
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&text).map_err(|e| invalid(path, e))
}

/// Write lines, each terminated by a newline
pub fn write_lines(path: &Path, lines: &[String]) -> Result<(), BatchError> {
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    fs::write(path, text).map_err(|e| io_error(path, e))
}

/// Read non-blank lines
pub fn read_lines(path: &Path) -> Result<Vec<String>, BatchError> {
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Persist normalized results
pub fn write_results(path: &Path, results: &[BatchResult]) -> Result<(), BatchError> {
    let lines = results
        .iter()
        .map(|result| serde_json::to_string(&ResultLine::from(result)).map_err(|e| invalid(path, e)))
        .collect::<Result<Vec<_>, _>>()?;
    write_lines(path, &lines)
}

/// Read a results file written by [`write_results`]
pub fn read_results(path: &Path) -> Result<Vec<BatchResult>, BatchError> {
    read_lines(path)?
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str::<ResultLine>(line)
                .map(BatchResult::from)
                .map_err(|e| invalid(path, format!("line {}: {}", idx + 1, e)))
        })
        .collect()
}

/// Locate the metadata side-car for a batch.
///
/// Uses the info record written at submission. Without one, falls back to
/// the most recently modified `*.metadata.json` in `dir`, which is only
/// right if no other batch was prepared since.
pub fn find_metadata(dir: &Path, batch_id: &str) -> Result<PathBuf, BatchError> {
    let info_file = info_path(dir, batch_id);
    if info_file.exists() {
        let info: BatchInfo = read_json(&info_file)?;
        let candidate = metadata_path(Path::new(&info.batch_file));
        if candidate.exists() {
            return Ok(candidate);
        }
        warn!(
            "Info record for batch {} points at missing metadata {}",
            batch_id,
            candidate.display()
        );
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BatchError::MetadataNotFound(batch_id.to_string()));
        }
        Err(e) => return Err(io_error(dir, e)),
    };
    let newest = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(METADATA_SUFFIX))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path);

    match newest {
        Some(path) => {
            warn!(
                "No info record links batch {} to its manifest; using most recent metadata {}",
                batch_id,
                path.display()
            );
            Ok(path)
        }
        None => Err(BatchError::MetadataNotFound(batch_id.to_string())),
    }
}
