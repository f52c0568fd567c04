//! Error types for graph loading

use thiserror::Error;

/// Errors that can occur while loading into the graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Database connection or driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A mutation was rejected by the store
    #[error("Query failed: {0}")]
    Query(String),

    /// The extraction result does not have the expected shape
    #[error("Invalid extraction payload: {0}")]
    InvalidPayload(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
