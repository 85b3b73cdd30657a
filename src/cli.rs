//! Command line surface.
//!
//! `serve` runs the Lambda runtime loop and is what the deployed binary does
//! when no subcommand is given. `submit` runs one submission locally against
//! the configured services, which is handy when checking credentials.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lambda_runtime::service_fn;

use crate::contract::SubmissionRequest;
use crate::handler::{handle_event, App};
use crate::load_config::load_config;
use crate::submission::process_submission;

/// Archive a submitted repository to cloud storage and notify the submitter.
#[derive(Parser)]
#[clap(name = "submission-archiver", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as a Lambda function, handling SNS submission events
    Serve,
    /// Process a single submission from the command line
    Submit {
        /// Submitter's email address; receives the outcome email
        #[clap(long)]
        email: String,
        /// Repository URL, e.g. https://github.com/org/repo
        #[clap(long)]
        url: String,
        #[clap(long, default_value = "")]
        assignment_id: String,
        #[clap(long, default_value = "")]
        account_id: String,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config()?;
    config.trace_loaded();
    let app = App::from_config(&config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(command = "serve", "Starting Lambda runtime");
            lambda_runtime::run(service_fn(|event| handle_event(event, &app)))
                .await
                .map_err(anyhow::Error::msg)
        }
        Commands::Submit {
            email,
            url,
            assignment_id,
            account_id,
        } => {
            let request = SubmissionRequest {
                email,
                repository_url: url,
                assignment_id,
                account_id,
            };
            tracing::info!(command = "submit", email = %request.email, "Processing submission");
            match process_submission(&request, &app.services()).await {
                Ok(report) => {
                    tracing::info!(command = "submit", ?report, "Submission complete");
                    println!("Submission complete.\nReport:");
                    println!("{:#?}", report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "submit", error = %e, "Submission failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
