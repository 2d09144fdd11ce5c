// src/storage/http.rs

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::info;
use url::Url;

use super::{ObjectStore, StorageError};

/// Anonymous download of public objects, e.g. from
/// `https://storage.googleapis.com/<bucket>/<object>`.
pub struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self, StorageError> {
        // a trailing slash makes `join` append instead of replacing the last segment
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn object_url(&self, bucket: &str, object: &str) -> Result<Url, StorageError> {
        Ok(self.base.join(&format!("{}/", bucket))?.join(object)?)
    }
}

impl ObjectStore for HttpStore {
    async fn download(
        &self,
        bucket: &str,
        object: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        let url = self.object_url(bucket, object)?;
        let resp = self.client.get(url.clone()).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(url.to_string()));
        }
        let resp = resp.error_for_status()?;

        let mut file = File::create(dest).await?;
        let mut written = 0u64;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("downloaded {} → {} ({} bytes)", url, dest.display(), written);
        Ok(written)
    }
}
