//! Fragments: the unit of source text fed to the extractor

/// Fragments with excerpts at or below this many characters are never selected.
pub const MIN_EXCERPT_CHARS: usize = 50;

/// A unit of source text with its provenance.
///
/// Provenance fields are optional because upstream sources do not always
/// record them; downstream stages treat a missing value as unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Stable identifier of the fragment
    pub fragment_id: String,

    /// Identifier of the parent document
    pub doc_id: String,

    /// The text to extract from
    pub excerpt: String,

    /// Citation-style locator recorded by the source (e.g. "B.01.008.2")
    pub canonical_locator: Option<String>,

    /// Issuing authority of the parent document
    pub authority: Option<String>,

    /// Jurisdiction of the parent document
    pub jurisdiction: Option<String>,
}

impl Fragment {
    /// Create a fragment with no provenance beyond its ids.
    pub fn new(
        fragment_id: impl Into<String>,
        doc_id: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            fragment_id: fragment_id.into(),
            doc_id: doc_id.into(),
            excerpt: excerpt.into(),
            canonical_locator: None,
            authority: None,
            jurisdiction: None,
        }
    }

    /// Set the issuing authority
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Set the jurisdiction
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    /// Set the canonical locator
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.canonical_locator = Some(locator.into());
        self
    }

    /// Whether the excerpt is long enough to be worth extracting from.
    pub fn is_extractable(&self) -> bool {
        self.excerpt.chars().count() > MIN_EXCERPT_CHARS
    }

    /// The provenance record kept alongside a batch manifest.
    pub fn metadata(&self) -> FragmentMetadata {
        FragmentMetadata {
            fragment_id: self.fragment_id.clone(),
            doc_id: self.doc_id.clone(),
            jurisdiction: self.jurisdiction.clone(),
            authority: self.authority.clone(),
        }
    }
}

/// Per-fragment provenance persisted next to a batch request file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentMetadata {
    /// Fragment identifier (also the batch custom id)
    pub fragment_id: String,

    /// Parent document identifier
    pub doc_id: String,

    /// Jurisdiction, if known
    pub jurisdiction: Option<String>,

    /// Authority, if known
    pub authority: Option<String>,
}

/// Selection criteria for fetching fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentQuery {
    /// Maximum number of fragments to return
    pub limit: Option<usize>,

    /// Number of fragments to skip (in source order)
    pub offset: usize,

    /// Only return fragments from this jurisdiction
    pub jurisdiction: Option<String>,
}

impl FragmentQuery {
    /// Whether a fragment passes the non-paging filters of this query.
    pub fn accepts(&self, fragment: &Fragment) -> bool {
        if !fragment.is_extractable() {
            return false;
        }
        match &self.jurisdiction {
            Some(wanted) => fragment.jurisdiction.as_deref() == Some(wanted.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "x".repeat(MIN_EXCERPT_CHARS + 1)
    }

    #[test]
    fn test_short_excerpt_is_not_extractable() {
        let fragment = Fragment::new("f1", "d1", "x".repeat(MIN_EXCERPT_CHARS));
        assert!(!fragment.is_extractable());
        assert!(Fragment::new("f1", "d1", long_text()).is_extractable());
    }

    #[test]
    fn test_query_filters_by_jurisdiction() {
        let query = FragmentQuery {
            jurisdiction: Some("CA".to_string()),
            ..Default::default()
        };

        let canadian = Fragment::new("f1", "d1", long_text()).with_jurisdiction("CA");
        let american = Fragment::new("f2", "d1", long_text()).with_jurisdiction("US");
        let unknown = Fragment::new("f3", "d1", long_text());

        assert!(query.accepts(&canadian));
        assert!(!query.accepts(&american));
        assert!(!query.accepts(&unknown));
    }

    #[test]
    fn test_metadata_copies_provenance() {
        let fragment = Fragment::new("f1", "d1", long_text())
            .with_authority("CFIA")
            .with_jurisdiction("CA");
        let meta = fragment.metadata();

        assert_eq!(meta.fragment_id, "f1");
        assert_eq!(meta.doc_id, "d1");
        assert_eq!(meta.authority.as_deref(), Some("CFIA"));
        assert_eq!(meta.jurisdiction.as_deref(), Some("CA"));
    }
}
