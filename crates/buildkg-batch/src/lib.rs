//! build-kg Batch Job Controller
//!
//! Runs extraction through a provider's asynchronous batch API in four
//! stages that may execute in separate processes:
//!
//! 1. **prepare**: render one prompt per fragment into a request manifest
//!    plus a metadata side-car
//! 2. **submit**: upload the manifest and record an info file linking the
//!    provider's batch id back to it
//! 3. **status**: poll once, or watch until the batch is terminal
//! 4. **process**: download results and load each one into the graph
//!
//! The artifact directory is the only state shared between stages; see
//! [`artifacts`] for the file layout.
//!
//! # Examples
//!
//! ```no_run
//! use buildkg_batch::{BatchConfig, BatchController};
//! use buildkg_llm::MockProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), buildkg_batch::BatchError> {
//! let controller = BatchController::new(MockProvider::default(), BatchConfig::in_dir("batch_data"));
//! let snapshot = controller.status("mock_batch_1", false, |s| println!("{}", s.status)).await?;
//! println!("{}", snapshot.provider_status);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod artifacts;
mod config;
mod controller;
mod error;

pub use config::BatchConfig;
pub use controller::{
    close_store, process_results, BatchController, FetchedBatch, PreparedBatch, ProcessedBatch,
    SubmittedBatch,
};
pub use error::BatchError;
