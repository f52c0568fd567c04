//! Error types for profile loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading profiles and ontologies
#[derive(Error, Debug)]
pub enum ProfileError {
    /// No profile file for the requested name or path
    #[error("Domain profile not found: {path}\nAvailable profiles: {available:?}")]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
        /// Profiles that do exist in the profile directory
        available: Vec<String>,
    },

    /// Ontology file does not exist
    #[error("Ontology file not found: {0}")]
    OntologyNotFound(PathBuf),

    /// A profile's `extends` chain loops back on itself
    #[error("Cyclic profile inheritance: {}", chain.join(" -> "))]
    CyclicExtends {
        /// Profiles visited, ending with the repeated one
        chain: Vec<String>,
    },

    /// File could not be read
    #[error("IO error reading {path}: {message}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// YAML could not be parsed or did not match the schema
    #[error("Invalid YAML in {path}: {message}")]
    Yaml {
        /// File being parsed
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// A configured regex failed to compile
    #[error("Invalid regex for pattern '{name}': {message}")]
    Regex {
        /// Pattern name, or the exclusion text
        name: String,
        /// Compiler message
        message: String,
    },
}
