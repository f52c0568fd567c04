//! Error types for batch operations

use thiserror::Error;

/// Errors that end a batch stage.
///
/// Per-request failures inside a batch are never reported here; they are
/// counted in the run statistics.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Nothing matched the fragment query
    #[error("No fragments to process")]
    NoFragments,

    /// Results were requested before the batch completed
    #[error("Batch {batch_id} not completed yet (status: {status})")]
    NotReady {
        /// Provider batch id
        batch_id: String,
        /// Status reported by the provider
        status: String,
    },

    /// No metadata side-car could be found for the batch
    #[error("Metadata file not found for batch {0}")]
    MetadataNotFound(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Artifact could not be read or written
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        message: String,
    },

    /// Artifact exists but is not valid
    #[error("Invalid artifact {path}: {message}")]
    InvalidArtifact {
        /// File involved
        path: String,
        /// Parse error
        message: String,
    },
}
