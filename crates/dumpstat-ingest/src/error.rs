//! Error types for dump ingestion

use std::path::PathBuf;

use crate::dataset::DatasetType;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for catalog, download, extraction and streaming
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Archive {path} is still corrupt after {attempts} download attempts")]
    RetriesExhausted { path: PathBuf, attempts: u32 },

    #[error("No cached {0} dump found, run a sync first")]
    NotCached(DatasetType),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Unknown dataset type: {0}")]
    UnknownDataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
