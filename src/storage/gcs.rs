// src/storage/gcs.rs

use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::{download::Range, get::GetObjectRequest},
};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::{ObjectStore, StorageError};

/// Authenticated Google Cloud Storage, using application default
/// credentials (`GOOGLE_APPLICATION_CREDENTIALS` or the gcloud ADC file).
pub struct GcsStore {
    client: Client,
}

impl GcsStore {
    pub async fn connect() -> Result<Self, StorageError> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))?;
        debug!("GCS client initialised");
        Ok(Self {
            client: Client::new(config),
        })
    }
}

impl ObjectStore for GcsStore {
    async fn download(
        &self,
        bucket: &str,
        object: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            object: object.to_string(),
            ..Default::default()
        };

        let bytes = self
            .client
            .download_object(&request, &Range::default())
            .await
            .map_err(|e| StorageError::Gcs {
                bucket: bucket.to_string(),
                object: object.to_string(),
                message: e.to_string(),
            })?;

        fs::write(dest, &bytes).await?;
        info!(
            "downloaded gs://{}/{} → {} ({} bytes)",
            bucket,
            object,
            dest.display(),
            bytes.len()
        );
        Ok(bytes.len() as u64)
    }
}
