//! `stratum run`: drive the sync loop in the foreground.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use tokio::sync::mpsc;

use stratum_core::{config, SyncConfig, SyncOutcome};
use stratum_daemon::{init_tracing, Syncer};
use stratum_sync::{HttpTransport, Reconciler};

/// Arguments for `stratum run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Authority server endpoint (http or https).
    #[arg(long)]
    pub url: String,

    /// Component whose strategies are synced.
    #[arg(long)]
    pub component: String,

    /// Basic auth password paired with the component name.
    #[arg(long)]
    pub password: String,

    /// Seconds between polls.
    #[arg(long, default_value_t = config::DEFAULT_INTERVAL.as_secs())]
    pub interval: u64,

    /// Seconds before a poll is abandoned.
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Durable cache file (defaults to the system temp directory).
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Host tag reported to the server instead of the local hostname.
    #[arg(long)]
    pub tag: Option<String>,

    /// Run a single reconciliation and exit.
    #[arg(long)]
    pub once: bool,

    /// Emit one JSON object per outcome.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();

        let (tx, mut rx) = mpsc::channel(16);
        let config = self.config(tx)?;

        if self.once {
            let reconciler =
                Reconciler::new(&config, Arc::new(HttpTransport::from_config(&config)));
            reconciler.seed_from_cache();
            let outcome = reconciler.reconcile();
            print_outcome(&outcome, self.json)?;
            if let Some(err) = outcome.error() {
                bail!("strategy sync failed: {err}");
            }
            return Ok(());
        }

        let mut syncer = Syncer::new(config);
        syncer.start().context("failed to start strategy sync")?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build signal runtime")?;
        let json = self.json;
        let watched = runtime.block_on(async {
            loop {
                tokio::select! {
                    outcome = rx.recv() => match outcome {
                        Some(outcome) => print_outcome(&outcome, json)?,
                        None => break,
                    },
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("failed to listen for ctrl-c")?;
                        break;
                    }
                }
            }
            Ok::<_, anyhow::Error>(())
        });

        // Nobody reads past this point; let a final delivery fail fast.
        drop(rx);
        syncer.join();
        watched
    }

    fn config(&self, tx: mpsc::Sender<SyncOutcome>) -> Result<SyncConfig> {
        let mut builder = SyncConfig::builder()
            .with_target_url(self.url.clone())
            .with_component(self.component.as_str())
            .with_basic_auth(self.password.clone())
            .with_interval_secs(self.interval)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_notify(tx);
        if let Some(tag) = self.tag.clone() {
            builder = builder.with_tag_fn(move || tag.clone());
        }
        if let Some(cache) = self.cache.clone() {
            builder = builder.with_cache_path(cache);
        }
        builder.build().context("invalid sync configuration")
    }
}

fn print_outcome(outcome: &SyncOutcome, json: bool) -> Result<()> {
    let at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    if json {
        let line = match outcome {
            SyncOutcome::Success(map) => {
                json!({ "at": at, "ok": true, "strategies": map.as_ref() })
            }
            SyncOutcome::Failure(err) => {
                json!({ "at": at, "ok": false, "error": err.to_string() })
            }
        };
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    match outcome {
        SyncOutcome::Success(map) => {
            let names: Vec<&str> = map.keys().map(|name| name.as_str()).collect();
            println!(
                "{} {} {} strategies: {}",
                at.bright_black(),
                "ok".green().bold(),
                map.len(),
                names.join(", ")
            );
        }
        SyncOutcome::Failure(err) => {
            println!("{} {} {}", at.bright_black(), "failed".red().bold(), err);
        }
    }
    Ok(())
}
