//! build-kg Extractor
//!
//! Everything between a text fragment and a graph load that does not talk
//! to the network directly.
//!
//! # Overview
//!
//! - **Provision IDs**: [`ProvisionIdExtractor`] recovers citation-style
//!   identifiers ("B.01.008.2", "21 CFR 101.61", "Chapter 27") with regexes
//!   compiled from the domain profile; [`ProvisionIdValidator`] checks them.
//! - **Prompts**: [`PromptBuilder`] renders the ontology-bound extraction
//!   prompt. Building a prompt without an ontology is a configuration error.
//! - **Parsing**: [`parse_extraction`] turns an LLM response into an
//!   [`ExtractionPayload`](buildkg_graph::ExtractionPayload).
//! - **Online mode**: [`Extractor`] sends fragments one at a time and loads
//!   each result, counting success / failed / skipped.
//!
//! # Architecture
//!
//! ```text
//! FragmentSource → PromptBuilder → LlmProvider → parse_extraction → GraphLoader → GraphStore
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use buildkg_domain::FragmentQuery;
//! use buildkg_extractor::{Extractor, ExtractorConfig, PromptBuilder};
//! use buildkg_graph::{GraphConfig, GraphLoader, MemoryGraphStore};
//! use buildkg_llm::MockProvider;
//! use buildkg_profile::{load_ontology, ProfileStore};
//!
//! # async fn example(source: impl buildkg_domain::FragmentSource) -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ProfileStore::new("domains").load_profile("food-safety")?;
//! let ontology = load_ontology("ontologies/software-architecture.yaml")?;
//! let prompts = PromptBuilder::for_profile(&profile, Some(ontology))?;
//! let loader = GraphLoader::new(prompts.root_node(), &GraphConfig::default());
//!
//! let mut extractor = Extractor::new(
//!     MockProvider::new(r#"{"entities": []}"#),
//!     MemoryGraphStore::new(),
//!     prompts,
//!     loader,
//!     ExtractorConfig::default(),
//! );
//!
//! let report = extractor.run(&source, &FragmentQuery::default()).await?;
//! println!("{}", report.stats);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod parser;
mod prompt;
mod provision_id;

#[cfg(test)]
mod tests;

pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::{load_response, Extractor, RunReport};
pub use parser::parse_extraction;
pub use prompt::{build_prompt, render_prompt_template, PromptBuilder};
pub use provision_id::{
    ExtractionMethod, ExtractionResult, ProvisionIdExtractor, ProvisionIdValidator, Validation,
    UNKNOWN_ID,
};
