// src/process/report.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, io, path::Path};

use super::state::Transition;
use crate::{config::EncoderFit, table::csv_io::staging_path};

/// Summary of one successful processing run, saved as `run_report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub encoder_fit: &'static str,
    pub train_rows: usize,
    pub test_rows: usize,
    pub selected_features: Vec<String>,
    pub log_transformed: Vec<String>,
    pub transitions: Vec<Transition>,
}

impl RunReport {
    pub fn encoder_fit_name(fit: EncoderFit) -> &'static str {
        match fit {
            EncoderFit::Train => "train",
            EncoderFit::PerDataset => "per_dataset",
        }
    }
}

/// Pretty-print `value` as JSON to `path` through a staging file.
pub(crate) fn write_json<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    let tmp_path = staging_path(path);
    let body = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp_path, body)?;
    fs::rename(&tmp_path, path)
}
