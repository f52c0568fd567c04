//! build-kg Graph Loader
//!
//! Turns parsed extraction results into graph mutations and applies them to
//! a property graph.
//!
//! # Architecture
//!
//! ```text
//! JSON response ──► ExtractionPayload ──► GraphLoader::plan ──► [GraphMutation]
//!                                                                    │
//!                                      ┌─────────────────────────────┤
//!                                      ▼                             ▼
//!                              AgeGraphStore                 MemoryGraphStore
//!                          (Cypher via PostgreSQL)            (tests, dry runs)
//! ```
//!
//! Entities get deterministic synthetic ids (`{label}_{fragment[..8]}_{n}`),
//! so reloading the same fragment in [`LoadMode::Upsert`] converges instead
//! of duplicating vertices. [`LoadMode::Create`] appends unconditionally.
//!
//! Query text is produced only by [`cypher`], which owns all escaping.

#![warn(missing_docs)]

mod age;
mod config;
pub mod cypher;
mod error;
mod loader;
mod memory;
mod payload;

pub use age::AgeGraphStore;
pub use config::{GraphConfig, LoadMode};
pub use error::GraphError;
pub use loader::{GraphLoader, LoadPlan, DEFAULT_EDGE_LABEL, DEFAULT_ROOT_LABEL};
pub use memory::{MemoryGraphStore, StoredEdge, StoredVertex};
pub use payload::{ExtractionPayload, RelationshipSpec};
