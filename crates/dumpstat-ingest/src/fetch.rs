//! Idempotent HTTP download of export archives

use dumpstat_common::units::format_bytes;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_LENGTH;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::Result;

/// What [`Fetcher::download`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// Destination already existed; nothing was requested
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Downloads remote files to the cache directory
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

/// Suffix of files still being written; they are renamed into place when complete
pub(crate) const PARTIAL_SUFFIX: &str = ".part";

/// Where `path` is written before it is complete
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

impl Fetcher {
    /// Archives can take far longer than any fixed deadline, so the configured
    /// timeout bounds connecting and each read instead of the whole transfer.
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .read_timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` to `dest` unless `dest` already exists.
    ///
    /// Existence is the only check: no resume and no integrity validation.
    /// A HEAD probe runs first and aborts the download if it fails.
    /// The body is written to a `.part` sibling and renamed onto `dest` only once
    /// complete, so an interrupted transfer never leaves `dest` behind.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<Fetched> {
        if tokio::fs::try_exists(dest).await? {
            debug!(path = %dest.display(), "Already downloaded, skipping");
            return Ok(Fetched::AlreadyPresent);
        }

        let size = self.probe(url).await?;
        info!(
            url = %url,
            size = size,
            "Downloading {} ({})",
            file_label(dest),
            format_bytes(size)
        );

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(dest);
        let result: Result<u64> = async {
            let bytes = self.stream_to(url, dest, &partial, size).await?;
            tokio::fs::rename(&partial, dest).await?;
            Ok(bytes)
        }
        .await;

        match result {
            Ok(bytes) => {
                info!(path = %dest.display(), "Downloaded {}", format_bytes(bytes));
                Ok(Fetched::Downloaded { bytes })
            },
            Err(e) => {
                warn!(path = %dest.display(), error = %e, "Download failed, removing partial file");
                remove_if_exists(&partial).await;
                Err(e)
            },
        }
    }

    /// Announced content length, 0 when the server does not say
    async fn probe(&self, url: &str) -> Result<u64> {
        let response = self.client.head(url).send().await?.error_for_status()?;

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        Ok(size)
    }

    async fn stream_to(&self, url: &str, dest: &Path, partial: &Path, size: u64) -> Result<u64> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let pb = download_progress(size, dest);
        let mut file = File::create(partial).await?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }

        file.flush().await?;
        pb.finish_and_clear();

        Ok(downloaded)
    }
}

fn download_progress(size: u64, dest: &Path) -> ProgressBar {
    let pb = ProgressBar::new(size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Downloading {}", file_label(dest)));
    pb
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Best-effort removal of a file that may not exist
pub(crate) async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {},
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_existing_destination_is_not_requested() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("posts-2024-01-01.csv.gz");
        tokio::fs::write(&dest, b"cached").await.unwrap();

        // Unroutable URL: any request would fail the test.
        let fetcher = Fetcher::with_client(Client::new());
        let outcome = fetcher.download("http://127.0.0.1:9/never", &dest).await.unwrap();

        assert_eq!(outcome, Fetched::AlreadyPresent);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_remove_if_exists_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        remove_if_exists(&dir.path().join("missing")).await;
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(Path::new("/cache/tags-2024-01-01.csv.gz")), "tags-2024-01-01.csv.gz");
    }
}
