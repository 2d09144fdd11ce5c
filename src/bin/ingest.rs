// src/bin/ingest.rs
use anyhow::{Context, Result};
use booking_pipeline::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    logging::init_tracing,
    pipeline,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Fetch the raw reservations object and write the train/test split.
#[derive(Parser, Debug)]
struct Args {
    /// Pipeline configuration (YAML)
    #[arg(long, env = "PIPELINE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let summary = pipeline::run_ingestion(&config)
        .await
        .context("data ingestion failed")?;

    info!(
        raw = summary.raw_rows,
        train = summary.train_rows,
        test = summary.test_rows,
        "done"
    );
    Ok(())
}
