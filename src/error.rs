// src/error.rs

use std::{fmt, panic::Location};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What went wrong while fetching or splitting the raw dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestionErrorKind {
    DownloadFailure,
    MissingInput,
    SplitFailure,
}

impl IngestionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionErrorKind::DownloadFailure => "download-failure",
            IngestionErrorKind::MissingInput => "missing-input",
            IngestionErrorKind::SplitFailure => "split-failure",
        }
    }
}

/// What went wrong inside the feature processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingErrorKind {
    PreprocessingFailure,
    BalancingFailure,
    FeatureSelectionFailure,
    IoFailure,
    InvalidTransition,
}

impl ProcessingErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingErrorKind::PreprocessingFailure => "preprocessing-failure",
            ProcessingErrorKind::BalancingFailure => "balancing-failure",
            ProcessingErrorKind::FeatureSelectionFailure => "feature-selection-failure",
            ProcessingErrorKind::IoFailure => "io-failure",
            ProcessingErrorKind::InvalidTransition => "invalid-transition",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigErrorKind {
    MissingFile,
    MalformedYaml,
    InvalidValue,
}

impl ConfigErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorKind::MissingFile => "missing-file",
            ConfigErrorKind::MalformedYaml => "malformed-yaml",
            ConfigErrorKind::InvalidValue => "invalid-value",
        }
    }
}

macro_rules! impl_kind_display {
    ($($kind:ty),*) => {
        $(impl fmt::Display for $kind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_kind_display!(IngestionErrorKind, ProcessingErrorKind, ConfigErrorKind);

/// Declares a stage error: a kind, a message, the call site that raised it
/// and an optional underlying cause.
macro_rules! stage_error {
    ($(#[$meta:meta])* $name:ident, $kind:ty) => {
        $(#[$meta])*
        #[derive(Debug, Error)]
        #[error("{kind}: {message} (raised at {location})")]
        pub struct $name {
            kind: $kind,
            message: String,
            location: &'static Location<'static>,
            #[source]
            source: Option<BoxError>,
        }

        impl $name {
            #[track_caller]
            pub fn new(kind: $kind, message: impl Into<String>) -> Self {
                Self {
                    kind,
                    message: message.into(),
                    location: Location::caller(),
                    source: None,
                }
            }

            pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
                self.source = Some(source.into());
                self
            }

            pub fn kind(&self) -> $kind {
                self.kind
            }

            pub fn message(&self) -> &str {
                &self.message
            }

            /// Source file and line where the error was raised.
            pub fn location(&self) -> &'static Location<'static> {
                self.location
            }
        }
    };
}

stage_error!(
    /// Failure of the ingestion stage (download or split).
    IngestionError,
    IngestionErrorKind
);

stage_error!(
    /// Failure of the feature processor.
    ProcessingError,
    ProcessingErrorKind
);

stage_error!(
    /// Failure to load or validate the YAML configuration.
    ConfigError,
    ConfigErrorKind
);

/// Any failure a pipeline binary can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
