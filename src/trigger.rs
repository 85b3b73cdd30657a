//! Parses the SNS notification that starts an invocation.
//!
//! The submission payload arrives as a JSON string in `Records[0].Sns.Message`.

use serde::Deserialize;
use tracing::{info, warn};

use crate::contract::SubmissionRequest;
use crate::error::TriggerError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsEvent {
    #[serde(default)]
    records: Vec<SnsRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsRecord {
    sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsMessage {
    message: String,
}

/// Extracts the submission request from an SNS event. Only the first record is used.
pub fn parse_trigger(event: serde_json::Value) -> Result<SubmissionRequest, TriggerError> {
    let envelope: SnsEvent = serde_json::from_value(event).map_err(TriggerError::Envelope)?;
    let record_count = envelope.records.len();
    let first = envelope
        .records
        .into_iter()
        .next()
        .ok_or(TriggerError::NoRecords)?;
    if record_count > 1 {
        warn!(record_count, "[TRIGGER] Event carries more than one record, processing the first only");
    }

    let request: SubmissionRequest =
        serde_json::from_str(&first.sns.message).map_err(TriggerError::Payload)?;
    info!(email = %request.email, url = %request.repository_url, "[TRIGGER] Parsed submission request");
    Ok(request)
}
