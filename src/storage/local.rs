// src/storage/local.rs

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use super::{ObjectStore, StorageError};

/// Buckets as directories: `bucket/object` lives at `<root>/<bucket>/<object>`.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for LocalStore {
    async fn download(
        &self,
        bucket: &str,
        object: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        let src = self.root.join(bucket).join(object);
        if !fs::try_exists(&src).await? {
            return Err(StorageError::NotFound(src.display().to_string()));
        }
        let bytes = fs::copy(&src, dest).await?;
        info!("copied {} → {} ({} bytes)", src.display(), dest.display(), bytes);
        Ok(bytes)
    }
}
