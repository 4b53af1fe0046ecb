use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tools;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "clp-search", about = "Search logs stored in a CLP deployment")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file layered over the user config
    #[arg(short, long, global = true, env = "CLP_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search and print its results page by page
    Search(commands::search::SearchArgs),
    /// Show a query job's status
    Status(commands::status::StatusArgs),
    /// Print a query job's results as JSON lines
    Results(commands::results::ResultsArgs),
    /// Answer tool calls read as JSON lines from stdin
    Serve,
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.config.as_deref();
    let load = || ConfigLoader::load(explicit);
    match cli.command {
        Commands::Search(args) => commands::search::run(args, &load()?).await,
        Commands::Status(args) => commands::status::run(args, &load()?).await,
        Commands::Results(args) => commands::results::run(args, &load()?).await,
        Commands::Serve => commands::serve::run(&load()?).await,
        Commands::Config(args) => commands::config::run(args, explicit),
    }
}
