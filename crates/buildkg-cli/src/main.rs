//! build-kg - ontology-driven knowledge graph extraction.

use buildkg_cli::commands;
use buildkg_cli::{Cli, Command, Formatter, Settings};
use buildkg_profile::{ProfileResolver, ProfileStore};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> buildkg_cli::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(domain) = cli.domain {
        settings.domain = domain;
    }

    let formatter = Formatter::new(settings.color && !cli.no_color);
    let mut resolver = ProfileResolver::new(
        ProfileStore::new(settings.domains_dir.clone()),
        settings.domain.clone(),
    );

    match cli.command {
        Command::Profiles(args) => commands::execute_profiles(args, &mut resolver, &formatter)?,
        Command::ExtractId(args) => {
            commands::execute_extract_id(args, &mut resolver, &formatter)?
        }
        Command::Prompt(args) => commands::execute_prompt(args, &mut resolver, &formatter)?,
        Command::Parse(args) => {
            commands::execute_parse(args, &settings, &mut resolver, &formatter).await?
        }
        Command::Batch(args) => {
            commands::execute_batch(args, &settings, &mut resolver, &formatter).await?
        }
    }

    Ok(())
}
