//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile or ontology error
    #[error(transparent)]
    Profile(#[from] buildkg_profile::ProfileError),

    /// Extraction error
    #[error(transparent)]
    Extractor(#[from] buildkg_extractor::ExtractorError),

    /// Batch lifecycle error
    #[error(transparent)]
    Batch(#[from] buildkg_batch::BatchError),

    /// Fragment source error
    #[error("Fragment source error: {0}")]
    Store(#[from] buildkg_store::StoreError),

    /// Graph store error
    #[error("Graph error: {0}")]
    Graph(#[from] buildkg_graph::GraphError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
