//! build-kg Profile Store
//!
//! Loads declarative domain profiles and ontologies from YAML.
//!
//! # Overview
//!
//! A profile parameterizes the whole pipeline for one subject area: the
//! system message sent to the model, the regex patterns used to recover
//! provision identifiers, and the graph ontology the model must follow.
//! Profiles may `extends` another profile; inheritance is resolved eagerly
//! at load time by deep-merging the raw YAML mappings, child first.
//!
//! # Architecture
//!
//! ```text
//! domains/<name>.yaml ──► ProfileStore::load_profile ──► DomainProfile
//!        ▲ extends                │
//!        └────────────────────────┘ deep_merge(base, child)
//!
//! ontologies/<file>.yaml ──► load_ontology ──► OntologyConfig
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use buildkg_profile::ProfileStore;
//!
//! # fn example() -> Result<(), buildkg_profile::ProfileError> {
//! let store = ProfileStore::new("domains");
//! let profile = store.load_profile("food-safety")?;
//! println!("{} v{}", profile.name, profile.version);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod defaults;
mod error;
mod merge;
mod model;
mod patterns;
mod resolver;
mod store;

pub use error::ProfileError;
pub use merge::deep_merge;
pub use model::{
    DiscoveryConfig, DomainProfile, EdgeDef, IdExtractionConfig, IdPatternConfig, NodeDef,
    OntologyConfig, ParsingConfig, PriorityTier, SubDomain,
};
pub use patterns::{compile_exclusions, compile_patterns, NamedPattern};
pub use resolver::ProfileResolver;
pub use store::{load_ontology, ProfileStore, DEFAULT_PROFILE_NAME};
