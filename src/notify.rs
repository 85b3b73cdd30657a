//! Outcome emails, sent through Amazon SES.

use async_trait::async_trait;
use aws_sdk_sesv2::error::DisplayErrorContext;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use tracing::{debug, error, info};

use crate::contract::Notifier;
use crate::error::{NotifyError, UploadError};

const CHARSET: &str = "UTF-8";

pub const SUCCESS_SUBJECT: &str = "Submission Successful";
pub const FAILURE_SUBJECT: &str = "Error Uploading to Google Cloud Storage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeMessage {
    pub subject: String,
    pub body: String,
}

pub fn success_message() -> OutcomeMessage {
    OutcomeMessage {
        subject: SUCCESS_SUBJECT.to_string(),
        body: "Your submission was successful.".to_string(),
    }
}

pub fn failure_message(error: &UploadError) -> OutcomeMessage {
    OutcomeMessage {
        subject: FAILURE_SUBJECT.to_string(),
        body: format!("Error: {error}"),
    }
}

/// SES v2 notifier. The recipient is always the address passed to
/// [`Notifier::send_email`]; `bcc` optionally copies an admin mailbox.
pub struct SesNotifier {
    client: aws_sdk_sesv2::Client,
    bcc: Option<String>,
}

impl SesNotifier {
    pub fn new(client: aws_sdk_sesv2::Client) -> Self {
        Self { client, bcc: None }
    }

    pub fn with_bcc(mut self, bcc: Option<String>) -> Self {
        self.bcc = bcc;
        self
    }
}

/// `recipient` is the only To address; `bcc` is added as a blind copy when set.
fn destination(recipient: &str, bcc: Option<&str>) -> Destination {
    Destination::builder()
        .to_addresses(recipient)
        .set_bcc_addresses(bcc.map(|bcc| vec![bcc.to_string()]))
        .build()
}

fn text(data: &str) -> Result<Content, NotifyError> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| NotifyError::Message(e.to_string()))
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send_email(
        &self,
        recipient: &str,
        source: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotifyError> {
        info!(recipient, source, subject, bcc = ?self.bcc, "[NOTIFY] Sending email");
        debug!(body, "[NOTIFY] Email body");

        let destination = destination(recipient, self.bcc.as_deref());
        let message = Message::builder()
            .subject(text(subject)?)
            .body(Body::builder().text(text(body)?).build())
            .build();

        let output = self
            .client
            .send_email()
            .from_email_address(source)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, recipient, "[NOTIFY] Error sending email");
                NotifyError::Service(message)
            })?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        info!(message_id = %message_id, recipient, "[NOTIFY] Email sent successfully");
        Ok(message_id)
    }
}
