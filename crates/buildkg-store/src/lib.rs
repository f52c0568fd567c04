//! build-kg Fragment Sources
//!
//! Implements the `FragmentSource` trait over the places fragments live.
//!
//! # Sources
//!
//! - [`PgFragmentSource`]: the `source_fragment` table written by the
//!   document chunker, joined to `source_document`
//! - [`JsonlFragmentSource`]: one JSON object per line, for offline runs
//!
//! Both apply the same selection: excerpts longer than 50 characters,
//! optional jurisdiction filter, source order, then offset and limit.
//!
//! # Examples
//!
//! ```no_run
//! use buildkg_domain::{FragmentQuery, FragmentSource};
//! use buildkg_store::JsonlFragmentSource;
//!
//! # async fn example() -> Result<(), buildkg_store::StoreError> {
//! let source = JsonlFragmentSource::new("fragments.jsonl");
//! let fragments = source.fetch(&FragmentQuery::default()).await?;
//! println!("{} fragments", fragments.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod jsonl;
mod postgres;

use thiserror::Error;

pub use jsonl::{FragmentRecord, JsonlFragmentSource};
pub use postgres::{fragment_query_sql, PgFragmentSource};

/// Errors that can occur while reading fragments
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File could not be read
    #[error("Failed to read {path}: {message}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        message: String,
    },

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
