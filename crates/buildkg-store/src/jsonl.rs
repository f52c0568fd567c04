//! Fragments from a JSON Lines file

use std::path::{Path, PathBuf};

use buildkg_domain::{Fragment, FragmentQuery, FragmentSource};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreError;

/// One line of a fragments file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    /// Fragment identifier
    pub fragment_id: String,
    /// Parent document identifier
    pub doc_id: String,
    /// Fragment text
    pub excerpt: String,
    /// Citation-style locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_locator: Option<String>,
    /// Issuing authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    /// Jurisdiction code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

impl From<FragmentRecord> for Fragment {
    fn from(record: FragmentRecord) -> Self {
        Fragment {
            fragment_id: record.fragment_id,
            doc_id: record.doc_id,
            excerpt: record.excerpt,
            canonical_locator: record.canonical_locator,
            authority: record.authority,
            jurisdiction: record.jurisdiction,
        }
    }
}

impl From<&Fragment> for FragmentRecord {
    fn from(fragment: &Fragment) -> Self {
        FragmentRecord {
            fragment_id: fragment.fragment_id.clone(),
            doc_id: fragment.doc_id.clone(),
            excerpt: fragment.excerpt.clone(),
            canonical_locator: fragment.canonical_locator.clone(),
            authority: fragment.authority.clone(),
            jurisdiction: fragment.jurisdiction.clone(),
        }
    }
}

/// Reads fragments from a `.jsonl` file; blank lines are ignored.
#[derive(Debug, Clone)]
pub struct JsonlFragmentSource {
    path: PathBuf,
}

impl JsonlFragmentSource {
    /// Create a source for a file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse file contents without applying any query.
    pub fn parse(contents: &str) -> Result<Vec<Fragment>, StoreError> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<FragmentRecord>(line)
                    .map(Fragment::from)
                    .map_err(|e| StoreError::InvalidData(format!("line {}: {}", idx + 1, e)))
            })
            .collect()
    }
}

impl FragmentSource for JsonlFragmentSource {
    type Error = StoreError;

    async fn fetch(&self, query: &FragmentQuery) -> Result<Vec<Fragment>, StoreError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        let fragments: Vec<Fragment> = Self::parse(&contents)?
            .into_iter()
            .filter(|fragment| query.accepts(fragment))
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        debug!(
            "Read {} fragments from {}",
            fragments.len(),
            self.path.display()
        );
        Ok(fragments)
    }
}
