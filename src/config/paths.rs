// src/config/paths.rs

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Every file the pipeline reads or writes, resolved from one artifacts root.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub raw_dir: PathBuf,
    pub raw_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub processed_dir: PathBuf,
    pub processed_train: PathBuf,
    pub processed_test: PathBuf,
    pub label_mappings: PathBuf,
    pub run_report: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let raw_dir = root.join("raw");
        let processed_dir = root.join("processed");

        Self {
            raw_file: raw_dir.join("raw.csv"),
            train_file: raw_dir.join("train.csv"),
            test_file: raw_dir.join("test.csv"),
            processed_train: processed_dir.join("processed_train.csv"),
            processed_test: processed_dir.join("processed_test.csv"),
            label_mappings: processed_dir.join("label_mappings.json"),
            run_report: processed_dir.join("run_report.json"),
            raw_dir,
            processed_dir,
        }
    }

    pub fn ensure_raw_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.raw_dir)
    }

    pub fn ensure_processed_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.processed_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_and_dir_creation() {
        let tmp = tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path().join("artifacts"));

        assert_eq!(paths.train_file, tmp.path().join("artifacts/raw/train.csv"));
        assert_eq!(
            paths.processed_test,
            tmp.path().join("artifacts/processed/processed_test.csv")
        );

        paths.ensure_raw_dir().unwrap();
        paths.ensure_processed_dir().unwrap();
        assert!(paths.raw_dir.is_dir());
        assert!(paths.processed_dir.is_dir());
    }
}
