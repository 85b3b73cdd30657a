//! Lambda entry point: wires long-lived clients to the submission pipeline.

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use crate::config::Config;
use crate::download::ArchiveDownloader;
use crate::notify::SesNotifier;
use crate::record::DynamoRecordStore;
use crate::submission::{process_submission, Services};
use crate::trigger::parse_trigger;
use crate::upload::GcsUploader;

/// Every client the handler needs, constructed once and reused across invocations.
pub struct App {
    downloader: ArchiveDownloader,
    uploader: GcsUploader,
    notifier: SesNotifier,
    records: DynamoRecordStore,
    source_email: String,
}

impl App {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let aws = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        info!(region = %config.region, "Constructed service clients");
        Ok(Self {
            downloader: ArchiveDownloader::new(http.clone(), config.scratch_dir.clone()),
            uploader: GcsUploader::new(
                http,
                config.bucket_name.clone(),
                config.google_credentials.clone(),
            ),
            notifier: SesNotifier::new(aws_sdk_sesv2::Client::new(&aws))
                .with_bcc(config.notify_bcc_email.clone()),
            records: DynamoRecordStore::new(
                aws_sdk_dynamodb::Client::new(&aws),
                config.table_name.clone(),
            ),
            source_email: config.source_email.clone(),
        })
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            downloader: &self.downloader,
            uploader: &self.uploader,
            notifier: &self.notifier,
            records: &self.records,
            source_email: &self.source_email,
        }
    }
}

pub async fn handle_event(event: LambdaEvent<Value>, app: &App) -> Result<String, Error> {
    info!(request_id = %event.context.request_id, "Lambda function invoked");
    handle_payload(event.payload, &app.services()).await
}

/// Parses the SNS payload and runs one submission. Any failure fails the invocation.
pub async fn handle_payload(payload: Value, services: &Services<'_>) -> Result<String, Error> {
    let request = parse_trigger(payload).map_err(|e| {
        error!(error = %e, "Rejected trigger payload");
        Error::from(e)
    })?;

    match process_submission(&request, services).await {
        Ok(report) => {
            info!(
                locator = %report.record.store_locator,
                message_id = %report.message_id,
                "Submission processed"
            );
            Ok(format!(
                "Successfully processed {} for {}",
                request.repository_url, request.email
            ))
        }
        Err(e) => {
            error!(error = %e, email = %request.email, "Submission failed");
            Err(Error::from(e))
        }
    }
}
