//! `stratum cache`: inspect the durable strategy cache.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use stratum_core::config::default_cache_path;
use stratum_core::StrategyMap;
use stratum_sync::cache;

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Print the last persisted strategy map.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Cache file to read (defaults to the system temp directory).
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Emit the map as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Show(args) => show(args),
    }
}

#[derive(Tabled)]
struct StrategyRow {
    #[tabled(rename = "strategy")]
    name: String,
    #[tabled(rename = "id")]
    id: i64,
    #[tabled(rename = "alias")]
    alias: String,
    #[tabled(rename = "content md5")]
    fingerprint: String,
    #[tabled(rename = "bytes")]
    bytes: usize,
}

fn show(args: ShowArgs) -> Result<()> {
    let path = args.cache.unwrap_or_else(default_cache_path);
    let cached = cache::load(&path);

    if args.json {
        let map = cached.unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    let map = match cached {
        Some(map) if !map.is_empty() => map,
        _ => {
            println!("no cached strategies at {}", path.display());
            return Ok(());
        }
    };

    println!("{}", path.display().to_string().bold());
    let mut table = Table::new(rows(&map));
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn rows(map: &StrategyMap) -> Vec<StrategyRow> {
    map.iter()
        .map(|(name, detail)| StrategyRow {
            name: name.to_string(),
            id: detail.id,
            alias: detail.alias.clone(),
            fingerprint: detail.fingerprint.clone(),
            bytes: detail.content.len(),
        })
        .collect()
}
