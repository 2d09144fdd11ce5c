// src/pipeline.rs
//! Stage entry points shared by the binaries.

use tracing::info;

use crate::{
    config::AppConfig,
    error::{IngestionError, IngestionErrorKind, PipelineError},
    ingest::{DataIngestion, SplitSummary},
    process::{report::RunReport, DataProcessor},
    storage::Storage,
};

/// Connect to the configured storage backend and run ingestion.
pub async fn run_ingestion(config: &AppConfig) -> Result<SplitSummary, PipelineError> {
    let ingest_cfg = config.data_ingestion.clone();
    let store = Storage::from_config(&ingest_cfg.storage).await.map_err(|e| {
        IngestionError::new(
            IngestionErrorKind::DownloadFailure,
            "connecting to object storage",
        )
        .with_source(e)
    })?;

    let ingestion = DataIngestion::new(ingest_cfg, config.artifact_paths(), store)?;
    Ok(ingestion.run().await?)
}

/// Run the feature processor over the split written by ingestion.
pub fn run_processing(config: &AppConfig) -> Result<RunReport, PipelineError> {
    let processor = DataProcessor::new(config.data_processing.clone(), config.artifact_paths())?;
    Ok(processor.process()?)
}

/// Ingestion then processing. Processing does not start if ingestion fails.
pub async fn run_all(config: &AppConfig) -> Result<RunReport, PipelineError> {
    let summary = run_ingestion(config).await?;
    info!(
        train = summary.train_rows,
        test = summary.test_rows,
        "ingestion done, starting processing"
    );
    run_processing(config)
}
