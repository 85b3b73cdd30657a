use anyhow::Result;
use clap::Parser;
use submission_archiver::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // JSON lines on stderr so CloudWatch can index the structured fields;
    // stdout carries only CLI output.
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();
    tracing::info!("startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("exited successfully"),
        Err(e) => tracing::error!(error = %e, "exited with error"),
    }
    result
}
