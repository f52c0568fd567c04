//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// build-kg - Turn regulatory text into a knowledge graph with an LLM.
#[derive(Debug, Parser)]
#[command(name = "build-kg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Domain profile name or path to a profile YAML file
    #[arg(short, long, global = true, env = "DOMAIN")]
    pub domain: Option<String>,

    /// Settings file path (default: ~/.build-kg/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect domain profiles
    Profiles(ProfilesArgs),

    /// Recover a provision id from text
    ExtractId(ExtractIdArgs),

    /// Render the extraction prompt for an excerpt
    Prompt(PromptArgs),

    /// Extract fragments one request at a time and load the graph
    Parse(ParseArgs),

    /// Run extraction through the provider's batch API
    Batch(BatchArgs),
}

/// Arguments for profile inspection.
#[derive(Debug, Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub action: ProfilesAction,
}

/// Profile actions.
#[derive(Debug, Subcommand)]
pub enum ProfilesAction {
    /// List available profiles
    List,

    /// Show a resolved profile
    Show {
        /// Profile name or path (default: the selected domain)
        name: Option<String>,
    },
}

/// Arguments for the extract-id command.
#[derive(Debug, Args)]
pub struct ExtractIdArgs {
    /// Fragment text
    #[arg(short, long)]
    pub text: String,

    /// Canonical locator
    #[arg(short, long)]
    pub locator: Option<String>,

    /// Issuing authority
    #[arg(short, long, default_value = "")]
    pub authority: String,
}

/// Ontology selection shared by the commands that build prompts.
#[derive(Debug, Args)]
pub struct OntologyArgs {
    /// Ontology YAML file (default: the profile's embedded ontology)
    #[arg(short, long)]
    pub ontology: Option<PathBuf>,
}

/// Arguments for the prompt command.
#[derive(Debug, Args)]
pub struct PromptArgs {
    #[command(flatten)]
    pub ontology: OntologyArgs,

    /// Excerpt text
    #[arg(short, long)]
    pub excerpt: String,

    /// Issuing authority
    #[arg(short, long, default_value = "")]
    pub authority: String,

    /// Jurisdiction
    #[arg(short, long, default_value = "")]
    pub jurisdiction: String,

    /// Render the profile's legacy prompt_template instead
    #[arg(long)]
    pub template: bool,
}

/// Fragment selection shared by parse and batch prepare.
#[derive(Debug, Args)]
pub struct FragmentArgs {
    /// Maximum number of fragments
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Fragments to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Only fragments from this jurisdiction
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Read fragments from a JSONL file instead of the database
    #[arg(long)]
    pub fragments: Option<PathBuf>,
}

/// Arguments for the parse command.
#[derive(Debug, Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub ontology: OntologyArgs,

    #[command(flatten)]
    pub selection: FragmentArgs,

    /// Process 5 fragments only
    #[arg(long)]
    pub test: bool,

    /// Merge vertices on their synthetic id instead of creating duplicates
    #[arg(long)]
    pub upsert: bool,
}

/// Arguments for batch operations.
#[derive(Debug, Args)]
pub struct BatchArgs {
    #[command(subcommand)]
    pub action: BatchAction,
}

/// Batch lifecycle stages.
#[derive(Debug, Subcommand)]
pub enum BatchAction {
    /// Write a request manifest and its metadata
    Prepare {
        #[command(flatten)]
        ontology: OntologyArgs,

        #[command(flatten)]
        selection: FragmentArgs,

        /// Manifest file name inside the batch directory
        #[arg(long, default_value = "batch_requests.jsonl")]
        output: String,
    },

    /// Submit a manifest to the provider
    Submit {
        /// Manifest path
        manifest: PathBuf,
    },

    /// Show batch status
    Status {
        /// Provider batch id
        batch_id: String,

        /// Poll until the batch finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// Download results and load them into the graph
    Process {
        /// Provider batch id
        batch_id: String,

        #[command(flatten)]
        ontology: OntologyArgs,

        /// Merge vertices on their synthetic id instead of creating duplicates
        #[arg(long)]
        upsert: bool,
    },
}
