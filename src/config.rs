use std::path::PathBuf;

use tracing::{debug, info};

use crate::upload::ServiceAccountKey;

pub const DEFAULT_SCRATCH_DIR: &str = "/tmp";

/// Process-wide settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub bucket_name: String,
    pub table_name: String,
    pub source_email: String,
    pub google_credentials: ServiceAccountKey,
    pub google_project_id: String,
    pub scratch_dir: PathBuf,
    /// Admin mailbox copied on every outcome email, if set.
    pub notify_bcc_email: Option<String>,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            region = %self.region,
            bucket_name = %self.bucket_name,
            table_name = %self.table_name,
            source_email = %self.source_email,
            google_project_id = %self.google_project_id,
            scratch_dir = %self.scratch_dir.display(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
