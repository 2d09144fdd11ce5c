// src/config/mod.rs

pub mod paths;

pub use paths::ArtifactPaths;

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::error::{ConfigError, ConfigErrorKind};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// The whole YAML document. One instance is built per pipeline run and
/// handed to each stage.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_ingestion: IngestionConfig,
    pub data_processing: ProcessingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    pub bucket_name: String,
    pub bucket_file_name: String,
    pub train_ratio: f64,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where `bucket_name/bucket_file_name` is fetched from.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Authenticated Google Cloud Storage (application default credentials).
    #[default]
    Gcs,
    /// Anonymous HTTPS download of a public object.
    Http {
        #[serde(default = "default_http_base")]
        base_url: String,
    },
    /// `<root>/<bucket>/<object>` on the local filesystem.
    Local { root: PathBuf },
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncoderFit {
    /// Fit label encoders on the training set and reuse them for test.
    /// Test categories train never saw share [`UNKNOWN_CODE`].
    ///
    /// [`UNKNOWN_CODE`]: crate::process::encode::UNKNOWN_CODE
    Train,
    /// Re-fit every categorical column independently for each dataset, so
    /// each set gets one code per distinct category.
    #[default]
    PerDataset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    pub categorical_columns: Vec<String>,
    pub numerical_columns: Vec<String>,
    pub skewness_threshold: f64,
    pub no_of_features: usize,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
    #[serde(default)]
    pub encoder_fit: EncoderFit,
    #[serde(default)]
    pub smote: SmoteConfig,
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub write_parquet: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmoteConfig {
    pub k_neighbors: usize,
    pub random_state: u64,
}

impl Default for SmoteConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            random_state: default_random_state(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub random_state: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            random_state: default_random_state(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub artifacts_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

fn default_random_state() -> u64 {
    42
}

fn default_http_base() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_label_column() -> String {
    "booking_status".to_string()
}

fn default_drop_columns() -> Vec<String> {
    vec!["Unnamed: 0".to_string(), "Booking_ID".to_string()]
}

impl AppConfig {
    /// Read and validate the YAML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::new(
                ConfigErrorKind::MissingFile,
                format!("config file not found at {}", path.display()),
            ));
        }

        let text = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                ConfigErrorKind::MissingFile,
                format!("reading {}", path.display()),
            )
            .with_source(e)
        })?;

        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(text).map_err(|e| {
            ConfigError::new(ConfigErrorKind::MalformedYaml, "parsing configuration YAML")
                .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.data_ingestion.train_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidValue,
                format!("data_ingestion.train_ratio must be in (0, 1), got {}", ratio),
            ));
        }

        let processing = &self.data_processing;
        if processing.no_of_features == 0 {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidValue,
                "data_processing.no_of_features must be a positive integer",
            ));
        }
        if processing.smote.k_neighbors == 0 {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidValue,
                "data_processing.smote.k_neighbors must be at least 1",
            ));
        }
        if processing.forest.n_estimators == 0 {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidValue,
                "data_processing.forest.n_estimators must be at least 1",
            ));
        }
        if processing.label_column.trim().is_empty() {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidValue,
                "data_processing.label_column must not be empty",
            ));
        }

        Ok(())
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.paths.artifacts_dir)
    }
}
