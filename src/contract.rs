//! # contract: the four service seams of a submission run
//!
//! This module defines the data carried between pipeline steps and one trait
//! per external service the pipeline talks to:
//!
//! - [`Downloader`]: fetches a repository archive into scratch storage
//! - [`Uploader`]: writes the archive to the object store
//! - [`Notifier`]: sends the outcome email
//! - [`RecordStore`]: persists the submission record
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so the orchestrator can be driven
//!   end to end without network access.
//! - Mocks are exported under the `test-export-mocks` feature for integration tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, NotifyError, PersistError, UploadError};

/// Inbound submission, parsed from the trigger payload. Lives for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub email: String,
    #[serde(rename = "url")]
    pub repository_url: String,
    /// Opaque, passed through unchanged.
    #[serde(default)]
    pub assignment_id: String,
    /// Opaque, passed through unchanged.
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Success,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Success => "success",
            SubmissionStatus::Failed => "failed",
        }
    }
}

/// The durable row written once per invocation.
///
/// `store_locator` is empty unless `status` is [`SubmissionStatus::Success`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub email: String,
    pub submission_url: String,
    pub store_locator: String,
    /// RFC 3339, stamped by the record writer at persistence time.
    pub email_sent_time: String,
    pub assignment_id: String,
    pub account_id: String,
    pub status: SubmissionStatus,
}

impl SubmissionRecord {
    /// Record for an upload that succeeded.
    pub fn succeeded(request: &SubmissionRequest, store_locator: String) -> Self {
        Self::from_request(request, store_locator, SubmissionStatus::Success)
    }

    /// Record for an upload that raised; the locator stays empty.
    pub fn failed(request: &SubmissionRequest) -> Self {
        Self::from_request(request, String::new(), SubmissionStatus::Failed)
    }

    fn from_request(
        request: &SubmissionRequest,
        store_locator: String,
        status: SubmissionStatus,
    ) -> Self {
        Self {
            email: request.email.clone(),
            submission_url: request.repository_url.clone(),
            store_locator,
            email_sent_time: String::new(),
            assignment_id: request.assignment_id.clone(),
            account_id: request.account_id.clone(),
            status,
        }
    }
}

/// Archive written to scratch storage by a [`Downloader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArchive {
    pub repository_name: String,
    pub archive_url: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
}

/// Object written by an [`Uploader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    /// Store-qualified locator, e.g. `gs://bucket/key`.
    pub locator: String,
}

/// Fetches the default-branch archive of a repository into scratch storage.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// `email` is only used for log context.
    async fn fetch_archive(
        &self,
        repository_url: &str,
        email: &str,
    ) -> Result<DownloadedArchive, FetchError>;
}

/// Writes a local archive to the object store under a key derived from `email`.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload_archive(
        &self,
        local_path: &Path,
        email: &str,
    ) -> Result<StoredObject, UploadError>;
}

/// Sends a plain-text transactional email and returns the provider message id.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(
        &self,
        recipient: &str,
        source: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotifyError>;
}

/// Durable table of submission records. Plain put, no conditional write.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_record(&self, record: &SubmissionRecord) -> Result<(), PersistError>;
}
