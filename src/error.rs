//! Error taxonomy for a single submission run.
//!
//! Each pipeline step owns one error enum. The orchestrator folds them into
//! [`SubmissionError`], which is what the Lambda handler and the CLI surface.
//! Nothing here is retried: every variant is terminal for the invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Archive download or repository URL parsing failed. Raised before any side effect.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid repository url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("archive download from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write archive to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Object store upload failed.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read archive {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage credentials rejected: {0}")]
    Credentials(String),

    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// The mail service rejected the message or could not be reached.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email message: {0}")]
    Message(String),

    #[error("mail service error: {0}")]
    Service(String),
}

/// The submission record could not be written.
#[derive(Debug, Error)]
#[error("table {table} write failed: {message}")]
pub struct PersistError {
    pub table: String,
    pub message: String,
}

/// The inbound event could not be turned into a submission request.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("event envelope contains no records")]
    NoRecords,

    #[error("malformed event envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed submission payload: {0}")]
    Payload(#[source] serde_json::Error),
}

/// Outcome of a failed submission run.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("archive fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("archive upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("record write failed: {0}")]
    Persist(#[from] PersistError),
}
