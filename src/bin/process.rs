// src/bin/process.rs
use anyhow::{Context, Result};
use booking_pipeline::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    logging::init_tracing,
    pipeline,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Preprocess, balance and feature-select the split written by `ingest`.
#[derive(Parser, Debug)]
struct Args {
    /// Pipeline configuration (YAML)
    #[arg(long, env = "PIPELINE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let report = pipeline::run_processing(&config).context("data processing failed")?;

    info!(features = ?report.selected_features, "done");
    Ok(())
}
