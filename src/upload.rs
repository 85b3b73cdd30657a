//! # upload: Cloud Storage uploader
//!
//! Writes a downloaded archive to a Google Cloud Storage bucket through the
//! JSON API media upload endpoint and returns its `gs://` locator.
//!
//! - Object keys are `<email>_<timestamp>.zip`, where the timestamp is an ISO 8601
//!   UTC instant with `:` replaced by `-`, so two submissions from the same
//!   address get distinct keys.
//! - Every failure is returned as an [`UploadError`]; nothing is swallowed.

pub mod credentials;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, info};

use crate::contract::{StoredObject, Uploader};
use crate::error::UploadError;
pub use credentials::{ServiceAccountKey, TokenSource};

pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// `<email>_<ISO 8601 timestamp with '-' for ':'>.zip`
pub fn object_key(email: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("{email}_{stamp}.zip")
}

/// `gs://<bucket>/<key>`
pub fn gcs_locator(bucket: &str, key: &str) -> String {
    format!("gs://{bucket}/{key}")
}

pub struct GcsUploader {
    client: reqwest::Client,
    bucket: String,
    endpoint: String,
    tokens: TokenSource,
}

impl GcsUploader {
    pub fn new(client: reqwest::Client, bucket: impl Into<String>, key: ServiceAccountKey) -> Self {
        Self {
            tokens: TokenSource::new(client.clone(), key),
            client,
            bucket: bucket.into(),
            endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
        }
    }

    /// Points the uploader at a different storage endpoint (emulators, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn put_object(
        &self,
        key: &str,
        file: tokio::fs::File,
        content_length: u64,
    ) -> Result<(), UploadError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/upload/storage/v1/b/{}/o", self.endpoint, self.bucket);

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
            .header(reqwest::header::CONTENT_LENGTH, content_length)
            .body(reqwest::Body::from(file))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Uploader for GcsUploader {
    async fn upload_archive(
        &self,
        local_path: &Path,
        email: &str,
    ) -> Result<StoredObject, UploadError> {
        let key = object_key(email, Utc::now());
        info!(bucket = %self.bucket, key = %key, path = %local_path.display(), "[UPLOAD] Uploading archive to Cloud Storage");

        let io_error = |e: std::io::Error| {
            error!(error = ?e, path = %local_path.display(), "[UPLOAD] Failed to open local archive");
            UploadError::Io {
                path: local_path.to_path_buf(),
                source: e,
            }
        };
        let file = tokio::fs::File::open(local_path).await.map_err(io_error)?;
        let content_length = file.metadata().await.map_err(io_error)?.len();

        if let Err(e) = self.put_object(&key, file, content_length).await {
            error!(error = %e, bucket = %self.bucket, key = %key, "[UPLOAD] Upload to Cloud Storage failed");
            return Err(e);
        }

        let locator = gcs_locator(&self.bucket, &key);
        info!(locator = %locator, "[UPLOAD] Upload to Cloud Storage finished");
        Ok(StoredObject { key, locator })
    }
}
