// src/main.rs
use anyhow::{Context, Result};
use booking_pipeline::{config::AppConfig, logging::init_tracing, pipeline};
use clap::Parser;
use std::{path::PathBuf, time::Instant};
use tracing::info;

/// Download the hotel reservations dataset, split it and build the
/// processed train/test tables.
#[derive(Parser, Debug)]
struct Args {
    /// Pipeline configuration (YAML)
    #[arg(long, env = "PIPELINE_CONFIG", default_value = booking_pipeline::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_tracing();
    let args = Args::parse();
    let start = Instant::now();

    // ─── 2) configuration ────────────────────────────────────────────
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;

    // ─── 3) ingestion + processing ───────────────────────────────────
    let report = pipeline::run_all(&config)
        .await
        .context("booking pipeline failed")?;

    info!(
        features = ?report.selected_features,
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        elapsed = ?start.elapsed(),
        "pipeline complete"
    );
    Ok(())
}
