//! # backfill: embed training rows that have no vector yet
//!
//! Uses the same configuration as the server (`config.yml`, `.env`, environment).

use admitrag::{backfill_embeddings, BackfillOptions};
use admitrag_server::{
    config::get_config,
    init_tracing,
    state::{build_embedder, build_storage},
};
use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The maximum number of rows to embed in this run
    #[arg(long, default_value_t = 20)]
    limit: u32,
    /// The pause between two rows, in milliseconds
    #[arg(long, default_value_t = 300)]
    delay_ms: u64,
    /// An explicit config file to load instead of `config.yml`
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    let cli = Cli::parse();

    let config = get_config(cli.config.as_deref())?;
    let storage = build_storage(&config.storage).await?;
    let embedder = build_embedder(&config.embedding)?;

    let options = BackfillOptions {
        limit: cli.limit,
        delay: Duration::from_millis(cli.delay_ms),
    };
    let report = backfill_embeddings(storage.training.as_ref(), embedder.as_ref(), options).await?;

    info!(
        found = report.found,
        updated = report.updated,
        failed = report.failed,
        "Backfill complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
