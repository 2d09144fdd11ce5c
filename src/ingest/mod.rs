// src/ingest/mod.rs

pub mod split;

use std::time::Instant;
use tracing::{error, info, instrument};

use crate::{
    config::{ArtifactPaths, IngestionConfig},
    error::{IngestionError, IngestionErrorKind},
    storage::{unpack, ObjectStore, StorageError},
    table::csv_io::{read_raw_csv, write_raw_csv},
};

/// Stage 1: pull the raw object out of its bucket and split it into
/// train/test CSVs.
pub struct DataIngestion<S> {
    config: IngestionConfig,
    paths: ArtifactPaths,
    store: S,
}

/// Row counts of a completed split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub raw_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl<S: ObjectStore> DataIngestion<S> {
    pub fn new(
        config: IngestionConfig,
        paths: ArtifactPaths,
        store: S,
    ) -> Result<Self, IngestionError> {
        paths.ensure_raw_dir().map_err(|e| {
            IngestionError::new(
                IngestionErrorKind::SplitFailure,
                format!("creating {}", paths.raw_dir.display()),
            )
            .with_source(e)
        })?;

        info!(
            bucket = %config.bucket_name,
            object = %config.bucket_file_name,
            "data ingestion initialised"
        );
        Ok(Self {
            config,
            paths,
            store,
        })
    }

    /// Download `bucket_name/bucket_file_name` to the raw file path.
    #[instrument(level = "info", skip(self), fields(bucket = %self.config.bucket_name))]
    pub async fn fetch(&self) -> Result<u64, IngestionError> {
        let bucket = &self.config.bucket_name;
        let object = &self.config.bucket_file_name;
        let download_failure = |e: StorageError| {
            IngestionError::new(
                IngestionErrorKind::DownloadFailure,
                format!("failed to download {} from bucket {}", object, bucket),
            )
            .with_source(e)
        };

        let raw_file = &self.paths.raw_file;
        let bytes = if unpack::is_zip(object) {
            let zip_path = raw_file.with_extension("zip");
            let bytes = self
                .store
                .download(bucket, object, &zip_path)
                .await
                .map_err(download_failure)?;
            let entry = unpack::unpack_into(&zip_path, raw_file).map_err(download_failure)?;
            info!(entry = %entry, "unpacked archive");
            bytes
        } else {
            self.store
                .download(bucket, object, raw_file)
                .await
                .map_err(download_failure)?
        };

        info!(path = %raw_file.display(), bytes, "raw file downloaded");
        Ok(bytes)
    }

    /// Split the raw file into train and test CSVs at `train_ratio`.
    #[instrument(level = "info", skip(self))]
    pub fn split(&self, train_ratio: f64) -> Result<SplitSummary, IngestionError> {
        let raw_file = &self.paths.raw_file;
        if !raw_file.is_file() {
            return Err(IngestionError::new(
                IngestionErrorKind::MissingInput,
                format!("raw file not found at {}", raw_file.display()),
            ));
        }

        let raw = read_raw_csv(raw_file).map_err(|e| {
            IngestionError::new(
                IngestionErrorKind::SplitFailure,
                format!("reading {}", raw_file.display()),
            )
            .with_source(e)
        })?;

        let (train, test) = split::train_test_split(&raw, train_ratio, self.config.random_state);

        for (table, path) in [(&train, &self.paths.train_file), (&test, &self.paths.test_file)] {
            write_raw_csv(table, path).map_err(|e| {
                IngestionError::new(
                    IngestionErrorKind::SplitFailure,
                    format!("writing {}", path.display()),
                )
                .with_source(e)
            })?;
            info!(path = %path.display(), rows = table.len(), "split saved");
        }

        Ok(SplitSummary {
            raw_rows: raw.len(),
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }

    /// Fetch then split. Failures are logged and returned; nothing written
    /// by an earlier step is removed.
    pub async fn run(&self) -> Result<SplitSummary, IngestionError> {
        let start = Instant::now();
        info!("starting data ingestion");

        let result = async {
            self.fetch().await?;
            self.split(self.config.train_ratio)
        }
        .await;

        match &result {
            Ok(summary) => info!(
                raw = summary.raw_rows,
                train = summary.train_rows,
                test = summary.test_rows,
                "data ingestion completed"
            ),
            Err(e) => error!("data ingestion failed: {}", e),
        }
        info!(elapsed = ?start.elapsed(), "data ingestion finished");
        result
    }
}
