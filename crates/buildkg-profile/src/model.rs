//! Profile and ontology data model
//!
//! Every section has serde defaults so a profile only needs to spell out
//! what differs from its base.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A complete domain profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainProfile {
    /// Human-readable name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Profile version
    #[serde(default = "default_version")]
    pub version: String,

    /// Name of the base profile this one was merged onto
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// LLM parsing settings
    #[serde(default)]
    pub parsing: ParsingConfig,

    /// Provision-ID extraction settings
    #[serde(default)]
    pub id_patterns: IdExtractionConfig,

    /// Source-discovery hints (parsed and preserved, not acted upon)
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Embedded graph ontology
    #[serde(default)]
    pub ontology: OntologyConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl DomainProfile {
    /// A bare profile with every section at its default
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: default_version(),
            extends: None,
            parsing: ParsingConfig::default(),
            id_patterns: IdExtractionConfig::default(),
            discovery: DiscoveryConfig::default(),
            ontology: OntologyConfig::default(),
        }
    }
}

/// LLM parsing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// System message sent with every request
    pub system_message: String,

    /// Requirement categories offered to the model
    pub requirement_types: Vec<String>,

    /// Deontic modalities offered to the model
    pub deontic_modalities: Vec<String>,

    /// Constraint logic categories offered to the model
    pub constraint_logic_types: Vec<String>,

    /// Example target signals
    pub target_signal_examples: Vec<String>,

    /// Example scopes
    pub scope_examples: Vec<String>,

    /// Optional legacy prompt template with `{placeholder}` fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            system_message:
                "You are a knowledge extraction expert. Always respond with valid JSON."
                    .to_string(),
            requirement_types: strings(&[
                "obligation",
                "prohibition",
                "permission",
                "documentation",
                "process",
                "testing",
                "reporting",
            ]),
            deontic_modalities: strings(&["must", "must_not", "may", "should", "should_not"]),
            constraint_logic_types: strings(&["threshold", "pattern", "enumeration", "boolean"]),
            target_signal_examples: strings(&[
                "entity.attribute",
                "document.field",
                "process.step",
            ]),
            scope_examples: strings(&["entity", "document", "process", "organization"]),
            prompt_template: None,
        }
    }
}

/// One named identifier pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdPatternConfig {
    /// Regular expression; capture group 1 is the identifier
    pub regex: String,

    /// `|`-separated flag names: IGNORECASE, MULTILINE, DOTALL
    #[serde(default)]
    pub flags: String,

    /// Confidence assigned to matches of this pattern
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.80
}

impl IdPatternConfig {
    /// Case-insensitive pattern at the default confidence
    pub fn ignore_case(regex: &str) -> Self {
        Self {
            regex: regex.to_string(),
            flags: "IGNORECASE".to_string(),
            confidence: default_confidence(),
        }
    }

    /// Case-sensitive pattern at the default confidence
    pub fn exact(regex: &str) -> Self {
        Self {
            regex: regex.to_string(),
            flags: String::new(),
            confidence: default_confidence(),
        }
    }
}

/// Provision-ID extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdExtractionConfig {
    /// Named patterns, tried in declaration order
    pub patterns: IndexMap<String, IdPatternConfig>,

    /// Authority name to ordered list of preferred pattern names
    pub authority_priorities: IndexMap<String, Vec<String>>,

    /// Regexes that, when they fully match a candidate, reject it
    pub exclusions: Vec<String>,

    /// Authority name to accepted ID formats, anchored at the start
    pub format_rules: IndexMap<String, Vec<String>>,
}

impl Default for IdExtractionConfig {
    fn default() -> Self {
        Self {
            patterns: IndexMap::new(),
            authority_priorities: IndexMap::new(),
            exclusions: strings(&[
                r"\b\d{4}\b",
                r"\b\d{1,3}%\b",
                r"\b\d+\s*(mg|g|ml|kg|mcg)\b",
                r"\b\d+\s*ppm\b",
            ]),
            format_rules: IndexMap::new(),
        }
    }
}

/// A sub-topic within a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubDomain {
    /// Sub-domain name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// Crawl priority tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityTier {
    /// Description
    pub description: String,
    /// Link depth
    pub depth: u32,
    /// Page cap
    pub max_pages: u32,
    /// Delay between requests (ms)
    pub delay: u64,
}

impl Default for PriorityTier {
    fn default() -> Self {
        Self {
            description: String::new(),
            depth: 2,
            max_pages: 50,
            delay: 1500,
        }
    }
}

/// Source-discovery hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Search query templates
    pub search_templates: Vec<String>,
    /// Sub-domains
    pub sub_domains: Vec<SubDomain>,
    /// Named priority tiers
    pub priority_tiers: IndexMap<String, PriorityTier>,
    /// Templates for filling coverage gaps
    pub gap_search_templates: Vec<String>,
    /// Extra sources
    pub supplementary_sources: Vec<String>,
}

/// A node type in the ontology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Vertex label
    pub label: String,
    /// Description shown to the model
    #[serde(default)]
    pub description: String,
    /// Property name to type hint
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

/// An edge type in the ontology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
    /// Edge label
    pub label: String,
    /// Source node label
    pub source: String,
    /// Target node label
    pub target: String,
    /// Description shown to the model
    #[serde(default)]
    pub description: String,
    /// Property name to type hint
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

/// Graph ontology definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// Description
    pub description: String,
    /// Node types, in prompt order
    pub nodes: Vec<NodeDef>,
    /// Edge types, in prompt order
    pub edges: Vec<EdgeDef>,
    /// Label for entities the model leaves untyped
    pub root_node: String,
    /// Literal response contract reproduced in the prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<String>,
}

impl OntologyConfig {
    /// An ontology is usable only with at least one node and a non-empty schema.
    pub fn is_usable(&self) -> bool {
        !self.nodes.is_empty()
            && self
                .json_schema
                .as_deref()
                .is_some_and(|schema| !schema.trim().is_empty())
    }
}
