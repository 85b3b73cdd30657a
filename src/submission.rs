//! Orchestrates one submission: fetch → upload → notify → record.
//!
//! The run walks a fixed sequence of stages:
//!
//! ```text
//! Received → Downloaded → Uploaded | UploadFailed → Notified → Recorded → Done
//! ```
//!
//! # Error Handling
//! - A fetch failure aborts before any email or record.
//! - An upload failure still sends the failure email and records a `failed`
//!   row, then the run ends with the upload error.
//! - A notification failure aborts before the record is written.
//! - Nothing already done is undone: an uploaded object is never deleted.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::contract::{
    Downloader, Notifier, RecordStore, SubmissionRecord, SubmissionRequest, Uploader,
};
use crate::error::SubmissionError;
use crate::notify::{failure_message, success_message};
use crate::record::save_record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Downloaded,
    Uploaded,
    UploadFailed,
    Notified,
    Recorded,
    Done,
}

/// Long-lived clients a run borrows. Built once per process.
pub struct Services<'a> {
    pub downloader: &'a dyn Downloader,
    pub uploader: &'a dyn Uploader,
    pub notifier: &'a dyn Notifier,
    pub records: &'a dyn RecordStore,
    /// Verified sender address for outcome emails.
    pub source_email: &'a str,
}

#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub record: SubmissionRecord,
    pub message_id: String,
    pub stages: Vec<Stage>,
}

fn advance(stages: &mut Vec<Stage>, next: Stage) {
    info!(stage = ?next, "[SUBMIT] Stage reached");
    stages.push(next);
}

pub async fn process_submission(
    request: &SubmissionRequest,
    services: &Services<'_>,
) -> Result<SubmissionReport, SubmissionError> {
    let mut stages = vec![Stage::Received];
    info!(email = %request.email, url = %request.repository_url, "[SUBMIT] Processing submission");

    let archive = services
        .downloader
        .fetch_archive(&request.repository_url, &request.email)
        .await
        .map_err(|e| {
            error!(error = %e, url = %request.repository_url, "[SUBMIT][ERROR] Archive fetch failed");
            e
        })?;
    advance(&mut stages, Stage::Downloaded);

    let upload = services
        .uploader
        .upload_archive(&archive.local_path, &request.email)
        .await;
    discard_scratch(&archive.local_path).await;

    let (record, message, upload_error) = match upload {
        Ok(object) => {
            advance(&mut stages, Stage::Uploaded);
            (
                SubmissionRecord::succeeded(request, object.locator),
                success_message(),
                None,
            )
        }
        Err(e) => {
            error!(error = %e, email = %request.email, "[SUBMIT][ERROR] Archive upload failed");
            advance(&mut stages, Stage::UploadFailed);
            let message = failure_message(&e);
            (SubmissionRecord::failed(request), message, Some(e))
        }
    };

    let sent = services
        .notifier
        .send_email(
            &request.email,
            services.source_email,
            &message.subject,
            &message.body,
        )
        .await;
    let message_id = match sent {
        Ok(id) => id,
        Err(notify_error) => {
            error!(error = %notify_error, email = %request.email, "[SUBMIT][ERROR] Notification could not be sent");
            return Err(match upload_error {
                Some(upload_error) => upload_error.into(),
                None => notify_error.into(),
            });
        }
    };
    advance(&mut stages, Stage::Notified);

    let saved = save_record(services.records, record, Utc::now()).await;
    if let Some(upload_error) = upload_error {
        match saved {
            Ok(_) => advance(&mut stages, Stage::Recorded),
            Err(e) => error!(error = %e, "[SUBMIT][ERROR] Failed submission could not be recorded"),
        }
        return Err(upload_error.into());
    }
    let record = saved.map_err(|e| {
        error!(error = %e, "[SUBMIT][ERROR] Record write failed");
        e
    })?;
    advance(&mut stages, Stage::Recorded);
    advance(&mut stages, Stage::Done);

    Ok(SubmissionReport {
        record,
        message_id,
        stages,
    })
}

/// Best-effort removal of the scratch archive.
async fn discard_scratch(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(error = ?e, path = %path.display(), "[SUBMIT] Could not remove scratch archive");
    }
}
