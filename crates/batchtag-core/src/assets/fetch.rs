//! Remote artifact store access.
//!
//! The resolver only needs "put this repository file in that directory";
//! [`HubFetcher`] does it over HTTP against a Hugging Face compatible hub.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DownloadConfig;
use crate::error::{PipelineError, PipelineResult};

use super::retry::{backoff_duration, is_retryable};

/// Fetches one file from a remote repository into a local directory.
///
/// Uses `async_trait` so the resolver can hold a `Box<dyn ArtifactFetcher>`.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch `filename` from `repo_id` and place it at
    /// `dest_dir/<basename of filename>`, returning that path.
    ///
    /// The returned path must only exist once the file is complete.
    async fn fetch(&self, repo_id: &str, filename: &str, dest_dir: &Path)
        -> PipelineResult<PathBuf>;
}

/// Streams repository files from a model hub with retries.
pub struct HubFetcher {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl HubFetcher {
    /// Create a fetcher with the configured endpoint, revision and timeout.
    pub fn new(config: DownloadConfig) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::DownloadFailed {
                id: config.endpoint.clone(),
                file: String::new(),
                message: format!("Failed to build HTTP client: {e}"),
                status_code: None,
                transient: false,
            })?;
        Ok(Self { client, config })
    }

    /// Resolve URL for a repository file at the configured revision.
    pub fn url_for(&self, repo_id: &str, filename: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            repo_id,
            self.config.revision,
            filename
        )
    }

    /// One download attempt: stream to `<dest>.part`, then rename into place.
    async fn download_once(
        &self,
        repo_id: &str,
        filename: &str,
        url: &str,
        dest: &Path,
    ) -> PipelineResult<()> {
        let part = partial_path(dest);
        let result = self.stream_to(repo_id, filename, url, &part).await;
        match result {
            Ok(()) => tokio::fs::rename(&part, dest)
                .await
                .map_err(|e| failure(repo_id, filename, format!("Failed to finalize: {e}"), None)),
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        repo_id: &str,
        filename: &str,
        url: &str,
        part: &Path,
    ) -> PipelineResult<()> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| request_failure(repo_id, filename, &e))?;

        let total_size = response.content_length();
        if let Some(size) = total_size {
            tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
        }

        let mut file = tokio::fs::File::create(part).await.map_err(|e| {
            failure(
                repo_id,
                filename,
                format!("Failed to create {}: {e}", part.display()),
                None,
            )
        })?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| request_failure(repo_id, filename, &e))?;
            file.write_all(&chunk).await.map_err(|e| {
                failure(
                    repo_id,
                    filename,
                    format!("Failed to write {}: {e}", part.display()),
                    None,
                )
            })?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total_size {
                if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                    tracing::info!(
                        "  Progress: {:.0}%",
                        downloaded as f64 / total as f64 * 100.0
                    );
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| failure(repo_id, filename, format!("Failed to flush: {e}"), None))?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactFetcher for HubFetcher {
    async fn fetch(
        &self,
        repo_id: &str,
        filename: &str,
        dest_dir: &Path,
    ) -> PipelineResult<PathBuf> {
        let basename = Path::new(filename)
            .file_name()
            .ok_or_else(|| failure(repo_id, filename, "Filename has no basename".into(), None))?;
        let dest = dest_dir.join(basename);
        let url = self.url_for(repo_id, filename);

        tracing::info!("Downloading {filename} from {repo_id}...");
        tracing::debug!("  Source: {url}");
        tracing::debug!("  Destination: {:?}", dest);

        let mut attempt = 0;
        loop {
            match self.download_once(repo_id, filename, &url, &dest).await {
                Ok(()) => return Ok(dest),
                Err(e) if attempt < self.config.retry_attempts && is_retryable(&e) => {
                    let delay = backoff_duration(attempt, self.config.retry_delay_ms);
                    tracing::warn!("{e}; retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn failure(repo_id: &str, filename: &str, message: String, status_code: Option<u16>) -> PipelineError {
    PipelineError::DownloadFailed {
        id: repo_id.to_string(),
        file: filename.to_string(),
        message,
        status_code,
        transient: false,
    }
}

fn request_failure(repo_id: &str, filename: &str, e: &reqwest::Error) -> PipelineError {
    let message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connect error: {e}")
    } else {
        e.to_string()
    };
    PipelineError::DownloadFailed {
        id: repo_id.to_string(),
        file: filename.to_string(),
        message,
        status_code: e.status().map(|s| s.as_u16()),
        transient: e.is_timeout() || e.is_connect(),
    }
}
