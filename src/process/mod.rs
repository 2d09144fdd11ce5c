// src/process/mod.rs

pub mod balance;
pub mod encode;
pub mod forest;
pub mod preprocess;
pub mod report;
pub mod select;
pub mod skew;
pub mod state;

use chrono::Utc;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::{
    config::{ArtifactPaths, EncoderFit, ProcessingConfig},
    error::{ProcessingError, ProcessingErrorKind},
    table::{
        csv_io::{read_table, write_table},
        parquet::write_parquet,
        Table, TableError,
    },
};
use encode::EncoderSet;
use preprocess::Preprocessed;
use report::{write_json, RunReport};
use state::{PipelineState, Stage};

/// Stage 2: turn the train/test split into model-ready tables.
pub struct DataProcessor {
    config: ProcessingConfig,
    paths: ArtifactPaths,
}

fn io_failure(context: String) -> impl FnOnce(TableError) -> ProcessingError {
    move |e| ProcessingError::new(ProcessingErrorKind::IoFailure, context).with_source(e)
}

impl DataProcessor {
    pub fn new(config: ProcessingConfig, paths: ArtifactPaths) -> Result<Self, ProcessingError> {
        paths.ensure_processed_dir().map_err(|e| {
            ProcessingError::new(
                ProcessingErrorKind::IoFailure,
                format!("creating {}", paths.processed_dir.display()),
            )
            .with_source(e)
        })?;
        Ok(Self { config, paths })
    }

    /// Read the train and test CSVs written by ingestion.
    pub fn load(&self) -> Result<(Table, Table), ProcessingError> {
        let train = read_table(&self.paths.train_file)
            .map_err(io_failure(format!("loading {}", self.paths.train_file.display())))?;
        let test = read_table(&self.paths.test_file)
            .map_err(io_failure(format!("loading {}", self.paths.test_file.display())))?;
        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            "data loaded"
        );
        Ok((train, test))
    }

    #[instrument(level = "info", skip_all, fields(rows = table.n_rows()))]
    pub fn preprocess(
        &self,
        table: &Table,
        fitted: Option<&EncoderSet>,
    ) -> Result<Preprocessed, ProcessingError> {
        preprocess::preprocess(table, &self.config, fitted)
    }

    #[instrument(level = "info", skip_all, fields(rows = table.n_rows()))]
    pub fn balance(&self, table: &Table) -> Result<Table, ProcessingError> {
        balance::balance(table, &self.config.label_column, &self.config.smote)
    }

    #[instrument(level = "info", skip_all, fields(k = self.config.no_of_features))]
    pub fn select_features(&self, table: &Table) -> Result<(Table, Vec<String>), ProcessingError> {
        select::select_features(
            table,
            &self.config.label_column,
            self.config.no_of_features,
            &self.config.forest,
        )
    }

    /// Encoders the test set is transformed with: train's under
    /// [`EncoderFit::Train`], none (fit on the test set itself) under
    /// [`EncoderFit::PerDataset`].
    pub fn encoders_for_test_set<'a>(&self, train: &'a Preprocessed) -> Option<&'a EncoderSet> {
        match self.config.encoder_fit {
            EncoderFit::Train => Some(&train.encoders),
            EncoderFit::PerDataset => None,
        }
    }

    /// Give `test` exactly `train_columns`, in that order. Columns the test
    /// set lacks are filled with 0.
    pub fn align(&self, test: &Table, train_columns: &[String]) -> Result<Table, ProcessingError> {
        let missing: Vec<&String> = train_columns.iter().filter(|c| !test.contains(c)).collect();
        if !missing.is_empty() {
            info!(columns = ?missing, "test set missing columns, filled with 0");
        }
        test.reindex(train_columns, 0.0).map_err(|e| {
            ProcessingError::new(
                ProcessingErrorKind::PreprocessingFailure,
                "aligning test columns to train",
            )
            .with_source(e)
        })
    }

    /// Write the processed tables, the fitted label mappings and, when
    /// enabled, Parquet copies of both tables.
    pub fn save(
        &self,
        train: &Table,
        test: &Table,
        encoders: &EncoderSet,
    ) -> Result<(), ProcessingError> {
        write_table(train, &self.paths.processed_train).map_err(io_failure(format!(
            "saving {}",
            self.paths.processed_train.display()
        )))?;
        write_table(test, &self.paths.processed_test).map_err(io_failure(format!(
            "saving {}",
            self.paths.processed_test.display()
        )))?;

        write_json(&encoders.mappings(), &self.paths.label_mappings).map_err(|e| {
            ProcessingError::new(
                ProcessingErrorKind::IoFailure,
                format!("saving {}", self.paths.label_mappings.display()),
            )
            .with_source(e)
        })?;

        if self.config.write_parquet {
            for (table, csv_path) in [
                (train, &self.paths.processed_train),
                (test, &self.paths.processed_test),
            ] {
                let path = csv_path.with_extension("parquet");
                write_parquet(table, &path)
                    .map_err(io_failure(format!("saving {}", path.display())))?;
            }
        }

        info!(
            train = %self.paths.processed_train.display(),
            test = %self.paths.processed_test.display(),
            "processed data saved"
        );
        Ok(())
    }

    /// Run every step in order and write `run_report.json`. Any failure is
    /// logged and returned; files saved by earlier steps stay on disk.
    pub fn process(&self) -> Result<RunReport, ProcessingError> {
        let start = Instant::now();
        info!("starting data processing");

        let mut state = PipelineState::new();
        let result = self.run_steps(&mut state);

        match &result {
            Ok(report) => info!(
                train_rows = report.train_rows,
                test_rows = report.test_rows,
                features = ?report.selected_features,
                "data processing completed"
            ),
            Err(e) => {
                let reached = state.current();
                state.fail();
                error!(after = reached.as_str(), "data processing failed: {}", e);
            }
        }
        info!(elapsed = ?start.elapsed(), "data processing finished");
        result
    }

    fn run_steps(&self, state: &mut PipelineState) -> Result<RunReport, ProcessingError> {
        let started_at = Utc::now();

        // 1) load
        let (train, test) = self.load()?;
        state.advance(Stage::Loaded)?;

        // 2) preprocess both sets
        let train = self.preprocess(&train, None)?;
        let test = self.preprocess(&test, self.encoders_for_test_set(&train))?;
        state.advance(Stage::Preprocessed)?;

        // 3) rebalance train only
        let balanced = self.balance(&train.table)?;
        state.advance(Stage::Balanced)?;

        // 4) feature selection driven by train
        let (selected, features) = self.select_features(&balanced)?;
        state.advance(Stage::FeatureSelected)?;

        // 5) test takes train's final columns
        let aligned = self.align(&test.table, selected.headers())?;
        state.advance(Stage::Aligned)?;

        // 6) save
        self.save(&selected, &aligned, &train.encoders)?;
        state.advance(Stage::Saved)?;

        state.advance(Stage::Done)?;
        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            encoder_fit: RunReport::encoder_fit_name(self.config.encoder_fit),
            train_rows: selected.n_rows(),
            test_rows: aligned.n_rows(),
            selected_features: features,
            log_transformed: train.log_transformed,
            transitions: state.history().to_vec(),
        };
        write_json(&report, &self.paths.run_report).map_err(|e| {
            ProcessingError::new(
                ProcessingErrorKind::IoFailure,
                format!("saving {}", self.paths.run_report.display()),
            )
            .with_source(e)
        })?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ForestConfig,
        process::{encode::UNKNOWN_CODE, preprocess::tests::processing_config},
        table::{
            csv_io::{read_table, write_raw_csv},
            float_array, string_array, RawTable,
        },
    };
    use std::{
        collections::{BTreeMap, HashSet},
        fs,
    };
    use tempfile::tempdir;

    fn config() -> ProcessingConfig {
        ProcessingConfig {
            forest: ForestConfig {
                n_estimators: 10,
                ..ForestConfig::default()
            },
            ..processing_config()
        }
    }

    /// `n` distinct bookings, one in four cancelled.
    fn bookings(n: usize, offset: usize, room_types: &[&str]) -> RawTable {
        let headers = ["Booking_ID", "room_type", "lead_time", "price", "booking_status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = (0..n)
            .map(|i| {
                let id = i + offset;
                let lead = if id % 4 == 0 { 150 + id % 30 } else { id % 40 };
                vec![
                    format!("INN{:05}", id),
                    room_types[id % room_types.len()].to_string(),
                    lead.to_string(),
                    format!("{}", 80 + (id * 7) % 50),
                    if id % 4 == 0 { "Canceled" } else { "Not_Canceled" }.to_string(),
                ]
            })
            .collect();
        RawTable { headers, rows }
    }

    fn setup(paths: &ArtifactPaths, test_rooms: &[&str]) {
        paths.ensure_raw_dir().unwrap();
        write_raw_csv(&bookings(200, 0, &["Room_Type 1", "Room_Type 2"]), &paths.train_file)
            .unwrap();
        write_raw_csv(&bookings(40, 1000, test_rooms), &paths.test_file).unwrap();
    }

    #[test]
    fn test_process_end_to_end() {
        let tmp = tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path());
        setup(&paths, &["Room_Type 2", "Room_Type 7"]);

        let processor = DataProcessor::new(config(), paths.clone()).unwrap();
        let report = processor.process().unwrap();

        let train = read_table(&paths.processed_train).unwrap();
        let test = read_table(&paths.processed_test).unwrap();

        // k features + label, label last, test mirrors train
        assert_eq!(train.n_cols(), 3);
        assert_eq!(train.headers().last().map(String::as_str), Some("booking_status"));
        assert_eq!(test.headers(), train.headers());
        assert_eq!(report.selected_features.len(), 2);

        // 150 not cancelled vs 50 cancelled, balanced to 150/150
        assert_eq!(train.n_rows(), 300);
        let labels = train.numeric("booking_status").unwrap();
        assert_eq!(labels.iter().filter(|&&v| v == 0.0).count(), 150);
        assert_eq!(labels.iter().filter(|&&v| v == 1.0).count(), 150);

        // test is encoded on its own categories, so nothing is unknown
        assert_eq!(report.encoder_fit, "per_dataset");
        if let Some(rooms) = test.numeric("room_type") {
            assert!(!rooms.contains(&UNKNOWN_CODE));
        }

        let mappings: BTreeMap<String, BTreeMap<String, usize>> =
            serde_json::from_slice(&fs::read(&paths.label_mappings).unwrap()).unwrap();
        assert_eq!(mappings["booking_status"]["Canceled"], 0);
        assert_eq!(mappings["room_type"]["Room_Type 2"], 1);

        let saved: serde_json::Value =
            serde_json::from_slice(&fs::read(&paths.run_report).unwrap()).unwrap();
        assert_eq!(saved["transitions"].as_array().unwrap().len(), 7);
        assert_eq!(saved["transitions"][6]["to"], "done");
        assert_eq!(report.log_transformed, vec!["lead_time".to_string()]);
    }

    #[test]
    fn test_default_fit_gives_test_categories_distinct_codes() {
        let tmp = tempdir().unwrap();
        let processor = DataProcessor::new(
            ProcessingConfig {
                encoder_fit: EncoderFit::default(),
                ..config()
            },
            ArtifactPaths::new(tmp.path()),
        )
        .unwrap();
        let table = |rooms: &[&str]| {
            let n = rooms.len();
            Table::new(
                vec!["room_type".into(), "lead_time".into(), "price".into()],
                vec![
                    string_array(rooms),
                    float_array((0..n).map(|i| i as f64).collect()),
                    float_array((0..n).map(|i| 10.0 + i as f64).collect()),
                ],
            )
            .unwrap()
        };

        let train = processor.preprocess(&table(&["A", "B"]), None).unwrap();
        let fitted = processor.encoders_for_test_set(&train);
        let test = processor
            .preprocess(&table(&["A", "X", "Y", "Z"]), fitted)
            .unwrap();

        let codes: HashSet<u64> = test
            .table
            .numeric("room_type")
            .unwrap()
            .iter()
            .map(|v| v.to_bits())
            .collect();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_train_fit_and_parquet() {
        let tmp = tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path());
        setup(&paths, &["Room_Type 2", "Room_Type 7"]);

        let cfg = ProcessingConfig {
            encoder_fit: EncoderFit::Train,
            write_parquet: true,
            ..config()
        };
        let report = DataProcessor::new(cfg, paths.clone())
            .unwrap()
            .process()
            .unwrap();
        assert_eq!(report.encoder_fit, "train");

        // an unseen room type in test is encoded with the train mapping
        let test = read_table(&paths.processed_test).unwrap();
        if let Some(rooms) = test.numeric("room_type") {
            assert!(rooms.contains(&UNKNOWN_CODE));
        }
        assert!(paths.processed_train.with_extension("parquet").is_file());
        assert!(paths.processed_test.with_extension("parquet").is_file());
    }

    #[test]
    fn test_align_fills_and_drops() {
        let tmp = tempdir().unwrap();
        let processor = DataProcessor::new(config(), ArtifactPaths::new(tmp.path())).unwrap();
        let test = Table::new(
            vec!["extra".into(), "lead_time".into()],
            vec![float_array(vec![9.0, 9.0]), float_array(vec![1.0, 2.0])],
        )
        .unwrap();

        let train_cols = vec!["price".to_string(), "lead_time".to_string()];
        let aligned = processor.align(&test, &train_cols).unwrap();
        assert_eq!(aligned.headers(), &train_cols[..]);
        assert_eq!(aligned.numeric("price"), Some(&[0.0, 0.0][..]));
        assert_eq!(aligned.numeric("lead_time"), test.numeric("lead_time"));
    }

    #[test]
    fn test_missing_split_is_io_failure() {
        let tmp = tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path());
        let err = DataProcessor::new(config(), paths.clone())
            .unwrap()
            .process()
            .unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::IoFailure);
        assert!(!paths.run_report.exists());
    }

    #[test]
    fn test_too_many_features_stops_before_save() {
        let tmp = tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path());
        setup(&paths, &["Room_Type 1"]);

        let cfg = ProcessingConfig {
            no_of_features: 10,
            ..config()
        };
        let err = DataProcessor::new(cfg, paths.clone())
            .unwrap()
            .process()
            .unwrap_err();
        assert_eq!(err.kind(), ProcessingErrorKind::FeatureSelectionFailure);
        assert!(!paths.processed_train.exists());
        assert!(!paths.run_report.exists());
    }
}
