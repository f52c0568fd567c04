//! build-kg Domain Layer
//!
//! Shared vocabulary for the extraction-to-graph pipeline. This crate has
//! ZERO external dependencies: it defines the value types that flow between
//! stages and the capability traits that the infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Fragment**: A unit of source text plus provenance metadata
//! - **Batch**: An asynchronous provider job and its lifecycle states
//! - **Graph mutation**: A typed description of one vertex or edge write,
//!   serialized to a query language only at the store boundary
//! - **Run statistics**: Per-fragment success / failed / skipped counters
//!
//! ## Architecture
//!
//! ```text
//! FragmentSource ──► PromptBuilder ──► LlmProvider ──► GraphLoader ──► GraphStore
//!                                          │
//!                               (batch: submit / poll / fetch)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod fragment;
pub mod graph;
pub mod stats;
pub mod traits;

// Re-exports for convenience
pub use batch::{BatchOutcome, BatchRequest, BatchResult, BatchSnapshot, BatchStatus, RequestCounts};
pub use fragment::{Fragment, FragmentMetadata, FragmentQuery, MIN_EXCERPT_CHARS};
pub use graph::{
    synthetic_id, GraphEntity, GraphMutation, GraphRelationship, Properties, PropertyValue,
    VertexRef,
};
pub use stats::{FragmentOutcome, RunStats};
pub use traits::{FragmentSource, GraphStore, LlmProvider};
