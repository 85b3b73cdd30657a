use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_SCRATCH_DIR};
use crate::upload::ServiceAccountKey;

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Environment variable found");
            Ok(value)
        }
        Ok(_) => {
            error!(var = name, "Environment variable is empty");
            Err(anyhow::anyhow!("{name} environment variable is empty"))
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            Err(anyhow::anyhow!("{name} environment variable not set: {e}"))
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Builds the process configuration from the environment.
///
/// Required: `REGION`, `BUCKET_NAME`, `DYNAMODB_TABLE`, `SOURCE_EMAIL`,
/// `GOOGLE_CREDENTIALS` (base64 service-account JSON), `GOOGLE_PROJECT_ID`.
/// Optional: `SCRATCH_DIR` (default `/tmp`), `NOTIFY_BCC_EMAIL`.
pub fn load_config() -> Result<Config> {
    let region = required_var("REGION")?;
    let bucket_name = required_var("BUCKET_NAME")?;
    let table_name = required_var("DYNAMODB_TABLE")?;
    let source_email = required_var("SOURCE_EMAIL")?;
    let google_project_id = required_var("GOOGLE_PROJECT_ID")?;

    let google_credentials = ServiceAccountKey::from_base64(&required_var("GOOGLE_CREDENTIALS")?)
        .map_err(|e| {
            error!(error = %e, "GOOGLE_CREDENTIALS could not be decoded");
            e
        })
        .context("GOOGLE_CREDENTIALS must be a base64-encoded service account key")?;

    match google_credentials.project_id.as_deref() {
        Some(key_project) if key_project != google_project_id => warn!(
            key_project,
            configured_project = %google_project_id,
            "Service account key belongs to a different project than GOOGLE_PROJECT_ID"
        ),
        _ => {}
    }

    let scratch_dir = optional_var("SCRATCH_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_DIR));
    let notify_bcc_email = optional_var("NOTIFY_BCC_EMAIL");

    info!(
        bucket_name = %bucket_name,
        table_name = %table_name,
        "Config loaded from environment successfully"
    );

    Ok(Config {
        region,
        bucket_name,
        table_name,
        source_email,
        google_credentials,
        google_project_id,
        scratch_dir,
        notify_bcc_email,
    })
}
