//! Local dump cache
//!
//! A flat directory of `<type>-<date>.csv.gz` archives and their decompressed
//! siblings. A decompressed file existing is the only freshness marker.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::dataset::DatasetType;
use crate::error::{IngestError, Result};
use crate::fetch::PARTIAL_SUFFIX;

/// A file in the cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheFile {
    /// `None` for files that belong to no known dataset type
    pub dataset: Option<DatasetType>,
    pub path: PathBuf,
    pub compressed: bool,
    pub size: u64,
}

impl CacheFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Dataset type a cached file belongs to, from its name
pub fn dataset_of(file_name: &str) -> Option<DatasetType> {
    DatasetType::ALL
        .into_iter()
        .find(|dataset| dataset.matches_file(file_name))
}

#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a listing file is stored locally
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Every complete regular file in the cache, sorted by name. Files still
    /// being written (`.part`) are skipped. A missing directory is empty.
    pub async fn list(&self) -> Result<Vec<CacheFile>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            files.push(CacheFile {
                dataset: dataset_of(&name),
                compressed: name.ends_with(".gz"),
                path: entry.path(),
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Decompressed files only
    pub async fn list_decompressed(&self) -> Result<Vec<CacheFile>> {
        Ok(self.list().await?.into_iter().filter(|f| !f.compressed).collect())
    }

    /// Newest decompressed dump of `dataset`, by greatest file name
    pub async fn latest_for(&self, dataset: DatasetType) -> Result<PathBuf> {
        self.list_decompressed()
            .await?
            .into_iter()
            .filter(|file| file.dataset == Some(dataset))
            .map(|file| file.path)
            .max()
            .ok_or(IngestError::NotCached(dataset))
    }

    /// Remove everything in the cache directory, returning the number of entries removed
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
            debug!(path = %path.display(), "Removed cache entry");
            removed += 1;
        }

        info!(dir = %self.root.display(), removed = removed, "Cleared dump cache");
        Ok(removed)
    }
}
