//! Stratum: component strategy sync CLI.
//!
//! # Usage
//!
//! ```text
//! stratum run --url <URL> --component <NAME> --password <SECRET> [--interval <SECS>] [--once] [--json]
//! stratum cache show [--cache <PATH>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{cache::CacheCommand, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "stratum",
    version,
    about = "Keep a component's strategies in sync with the authority server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the authority server and print every sync outcome.
    Run(RunArgs),

    /// Inspect the durable strategy cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Cache { command } => commands::cache::run(command),
    }
}
