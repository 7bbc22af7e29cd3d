//! HTTP collaborators
//!
//! Two shapes: a bounded fetch for small pages (directory listings,
//! assertion files) and a streaming artifact download that reports
//! progress and completion through callbacks and can be canceled.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::warn;

/// Progress callback: (bytes so far, total if known).
pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;
/// Completion callback, called exactly once with the success flag.
pub type ResultFn = Box<dyn FnOnce(bool) + Send>;

const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Cancelable handle to an in-flight artifact download.
pub struct DownloadHandle {
    join: JoinHandle<()>,
}

impl DownloadHandle {
    /// Wrap a spawned transfer task; for fetcher implementations.
    pub fn from_join(join: JoinHandle<()>) -> Self {
        Self { join }
    }

    /// Abort the transfer. The result callback will not fire afterwards.
    pub fn cancel(&self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// HTTP collaborator interface.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a small page as text. Non-2xx is an error.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Fetch a small binary file (detached signatures). Non-2xx is an
    /// error.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Stream an artifact to `path`, reporting progress as it arrives.
    fn download(
        &self,
        path: &Path,
        url: &str,
        on_progress: ProgressFn,
        on_result: ResultFn,
    ) -> DownloadHandle;
}

/// Production fetcher on reqwest.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("monero-update/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(PAGE_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching {url} returned HTTP {}", response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(PAGE_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching {url} returned HTTP {}", response.status());
        }

        Ok(response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?
            .to_vec())
    }

    fn download(
        &self,
        path: &Path,
        url: &str,
        on_progress: ProgressFn,
        on_result: ResultFn,
    ) -> DownloadHandle {
        let client = self.client.clone();
        let path: PathBuf = path.to_path_buf();
        let url = url.to_string();

        let join = tokio::spawn(async move {
            let success = stream_to_file(&client, &path, &url, &on_progress).await;
            if let Err(e) = &success {
                warn!("Download of {url} failed: {e}");
            }
            on_result(success.is_ok());
        });

        DownloadHandle { join }
    }
}

async fn stream_to_file(
    client: &reqwest::Client,
    path: &Path,
    url: &str,
    on_progress: &ProgressFn,
) -> Result<()> {
    let mut response = client
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .with_context(|| format!("Failed to start download of {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Download of {url} returned HTTP {}", response.status());
    }

    let total = response.content_length();
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut received: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("Failed while downloading {url}"))?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        received += chunk.len() as u64;
        on_progress(received, total);
    }

    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    // The streaming path is exercised against fake fetchers in the
    // pipeline tests; here we only pin the handle semantics.

    #[tokio::test]
    async fn test_canceled_download_never_reports() {
        let reported = Arc::new(AtomicBool::new(false));
        let reported_clone = Arc::clone(&reported);

        let join = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            reported_clone.store(true, Ordering::SeqCst);
        });
        let handle = DownloadHandle { join };

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_finished());
        assert!(!reported.load(Ordering::SeqCst));
    }
}
