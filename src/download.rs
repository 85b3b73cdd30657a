//! Archive fetcher: downloads a repository's default-branch zip into scratch storage.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::contract::{DownloadedArchive, Downloader};
use crate::error::FetchError;

pub const DEFAULT_BRANCH: &str = "main";

static REPOSITORY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?)://[^/\s]+/(?:[^/\s]+/)*(?P<name>[^/\s]+?)(?:\.git)?/?$")
        .expect("repository name pattern is valid")
});

/// Strips a trailing `/` and `.git` so the archive path can be appended.
pub fn normalise_repository_url(repository_url: &str) -> &str {
    let trimmed = repository_url.trim().trim_end_matches('/');
    trimmed.strip_suffix(".git").unwrap_or(trimmed)
}

/// `<repository>/archive/main.zip`
pub fn archive_url(repository_url: &str) -> String {
    format!(
        "{}/archive/{DEFAULT_BRANCH}.zip",
        normalise_repository_url(repository_url)
    )
}

/// Last path segment of the repository URL, without `.git`.
pub fn repository_name(repository_url: &str) -> Result<String, FetchError> {
    REPOSITORY_NAME
        .captures(repository_url.trim())
        .and_then(|caps| caps.name("name"))
        .map(|name| name.as_str().to_string())
        .ok_or_else(|| FetchError::InvalidUrl {
            url: repository_url.to_string(),
            reason: "expected an http(s) url with a repository path".to_string(),
        })
}

/// Local file name used for a downloaded archive: `<repository>-main.zip`.
pub fn archive_file_name(repository_name: &str) -> String {
    format!("{repository_name}-{DEFAULT_BRANCH}.zip")
}

/// Downloads archives over HTTP into a shared scratch directory.
pub struct ArchiveDownloader {
    client: reqwest::Client,
    scratch_dir: PathBuf,
}

impl ArchiveDownloader {
    pub fn new(client: reqwest::Client, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait]
impl Downloader for ArchiveDownloader {
    async fn fetch_archive(
        &self,
        repository_url: &str,
        email: &str,
    ) -> Result<DownloadedArchive, FetchError> {
        let repository_name = repository_name(repository_url).map_err(|e| {
            error!(error = %e, repository_url, email, "[FETCH] Could not parse repository url");
            e
        })?;
        let url = archive_url(repository_url);
        info!(archive_url = %url, repository = %repository_name, email, "[FETCH] Downloading repository archive");

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!(error = ?e, archive_url = %url, "[FETCH] Archive request failed");
            FetchError::Request {
                url: url.clone(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, archive_url = %url, "[FETCH] Archive source returned error status");
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_dir).await {
            error!(error = ?e, path = %self.scratch_dir.display(), "[FETCH] Failed to create scratch directory");
            return Err(FetchError::Io {
                path: self.scratch_dir.clone(),
                source: e,
            });
        }

        let local_path = self.scratch_dir.join(archive_file_name(&repository_name));
        let size_bytes = match stream_to_file(response, &local_path, &url).await {
            Ok(size_bytes) => size_bytes,
            Err(e) => {
                // Never leave a truncated archive behind.
                let _ = tokio::fs::remove_file(&local_path).await;
                return Err(e);
            }
        };
        debug!(path = %local_path.display(), size_bytes, "[FETCH] Archive written to scratch");
        info!(path = %local_path.display(), "[FETCH] Downloaded repository archive");

        Ok(DownloadedArchive {
            repository_name,
            archive_url: url,
            local_path,
            size_bytes,
        })
    }
}

/// Copies the response body to `path` chunk by chunk and returns the bytes written.
async fn stream_to_file(
    mut response: reqwest::Response,
    path: &Path,
    url: &str,
) -> Result<u64, FetchError> {
    let io_error = |e: std::io::Error| {
        error!(error = ?e, path = %path.display(), "[FETCH] Failed to write archive");
        FetchError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    };

    let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
    let mut written = 0u64;
    loop {
        let chunk = response.chunk().await.map_err(|e| {
            error!(error = ?e, archive_url = %url, "[FETCH] Failed reading archive body");
            FetchError::Request {
                url: url.to_string(),
                source: e,
            }
        })?;
        let Some(chunk) = chunk else { break };
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;
    Ok(written)
}
