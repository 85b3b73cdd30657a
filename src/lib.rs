//! submission-archiver: archives a submitted git repository to Cloud Storage,
//! emails the submitter the outcome and records it in DynamoDB.
//!
//! One SNS notification drives one run of [`submission::process_submission`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod handler;
pub mod load_config;
pub mod notify;
pub mod record;
pub mod submission;
pub mod trigger;
pub mod upload;
