// src/storage/mod.rs

pub mod gcs;
pub mod http;
pub mod local;
pub mod unpack;

pub use gcs::GcsStore;
pub use http::HttpStore;
pub use local::LocalStore;

use std::path::Path;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("authenticating to GCS: {0}")]
    Auth(String),
    #[error("GCS request for gs://{bucket}/{object} failed: {message}")]
    Gcs {
        bucket: String,
        object: String,
        message: String,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid object URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("object {0} not found")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive: {0}")]
    Archive(String),
}

/// Something that can copy a named object out of a bucket onto local disk.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Write `bucket/object` to `dest`, returning the number of bytes written.
    async fn download(&self, bucket: &str, object: &str, dest: &Path)
        -> Result<u64, StorageError>;
}

/// The backend chosen in `data_ingestion.storage`.
pub enum Storage {
    Gcs(GcsStore),
    Http(HttpStore),
    Local(LocalStore),
}

impl Storage {
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(match config {
            StorageConfig::Gcs => Storage::Gcs(GcsStore::connect().await?),
            StorageConfig::Http { base_url } => Storage::Http(HttpStore::new(base_url)?),
            StorageConfig::Local { root } => Storage::Local(LocalStore::new(root)),
        })
    }
}

impl ObjectStore for Storage {
    async fn download(
        &self,
        bucket: &str,
        object: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        match self {
            Storage::Gcs(s) => s.download(bucket, object, dest).await,
            Storage::Http(s) => s.download(bucket, object, dest).await,
            Storage::Local(s) => s.download(bucket, object, dest).await,
        }
    }
}
