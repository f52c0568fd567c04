//! build-kg CLI library.
//!
//! Settings resolution, command execution and output formatting for the
//! `build-kg` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Settings;
pub use error::{CliError, Result};
pub use output::Formatter;
