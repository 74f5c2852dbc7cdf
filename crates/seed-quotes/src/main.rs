use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use nova_muse_stack::storage::TABLE_NAME;
use seed_quotes::{load_quotes, sample_quotes, seed, DynamoQuoteStore};
use tracing::info;

/// Load quotes into the NovaMuse quotes table, skipping ones already present.
#[derive(Debug, Parser)]
#[command(name = "seed-quotes", version)]
struct Args {
    /// Table to seed.
    #[arg(long, env = "QUOTES_TABLE", default_value = TABLE_NAME)]
    table_name: String,

    /// AWS region of the table.
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// JSON file holding an array of quotes. Defaults to the built-in set.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();

    let quotes = match &args.file {
        Some(path) => load_quotes(path)?,
        None => sample_quotes(),
    };

    let store = DynamoQuoteStore::connect(&args.region, &args.table_name).await;
    let report = seed(&store, &quotes, Utc::now()).await?;

    info!(
        "Seeded {}: {} inserted, {} skipped",
        store.table_name(),
        report.inserted.len(),
        report.skipped.len()
    );

    Ok(())
}
