//! Record writer: stamps and persists the submission record to DynamoDB.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info};

use crate::contract::{RecordStore, SubmissionRecord};
use crate::error::PersistError;

/// Stamps `email_sent_time` with `now` and writes the record.
///
/// Returns the record as written. The put is unconditional, so a second run
/// with the same identity overwrites the first.
pub async fn save_record<S>(
    store: &S,
    mut record: SubmissionRecord,
    now: DateTime<Utc>,
) -> Result<SubmissionRecord, PersistError>
where
    S: RecordStore + ?Sized,
{
    record.email_sent_time = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    debug!(?record, "[RECORD] Saving submission record");
    store.put_record(&record).await?;
    info!(email = %record.email, status = record.status.as_str(), "[RECORD] Saved submission record");
    Ok(record)
}

/// DynamoDB item for a record. Attribute names follow the record's camelCase fields.
pub fn to_item(record: &SubmissionRecord) -> HashMap<String, AttributeValue> {
    let attributes = [
        ("email", record.email.as_str()),
        ("submissionUrl", record.submission_url.as_str()),
        ("storeLocator", record.store_locator.as_str()),
        ("emailSentTime", record.email_sent_time.as_str()),
        ("assignmentId", record.assignment_id.as_str()),
        ("accountId", record.account_id.as_str()),
        ("status", record.status.as_str()),
    ];
    attributes
        .into_iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::S(value.to_string())))
        .collect()
}

pub struct DynamoRecordStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoRecordStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn put_record(&self, record: &SubmissionRecord) -> Result<(), PersistError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(record)))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, table = %self.table, "[RECORD] Error saving record to DynamoDB");
                PersistError {
                    table: self.table.clone(),
                    message,
                }
            })?;
        Ok(())
    }
}
