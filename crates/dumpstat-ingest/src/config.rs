//! Ingestion configuration
//!
//! Loaded from the environment (and a `.env` file when present) with the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IngestError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Listing page of the bulk export.
pub const DEFAULT_BASE_URL: &str = "https://e621.net/db_export/";

/// Flat directory holding compressed and decompressed dumps.
pub const DEFAULT_CACHE_DIR: &str = "./cache_data";

/// User-Agent sent with every request; the export host rejects anonymous clients.
pub const DEFAULT_USER_AGENT: &str = "prometheus-e621-exporter/1.0";

/// Minimum posts per tag before the tag is published.
pub const DEFAULT_TAG_THRESHOLD: u64 = 1000;

/// Minimum posts per source domain before the domain is published.
pub const DEFAULT_SOURCE_THRESHOLD: u64 = 100;

/// Rows between two progress observations.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Windows sampled by the row count estimator.
pub const DEFAULT_ESTIMATE_SAMPLES: usize = 1000;

/// Download attempts for an archive that keeps failing to decompress.
pub const DEFAULT_MAX_EXTRACT_ATTEMPTS: u32 = 3;

/// HTTP timeout; dumps are several gigabytes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Seconds between two ingestion cycles (daily).
pub const DEFAULT_INTERVAL_SECS: u64 = 86_400;

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Export listing URL, always ending in `/`
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub user_agent: String,
    /// Cardinality threshold for `e621_posts_by_tag`
    pub tag_threshold: u64,
    /// Cardinality threshold for `e621_posts_by_source_domain`
    pub source_threshold: u64,
    pub progress_interval: u64,
    pub estimate_samples: usize,
    pub max_extract_attempts: u32,
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tag_threshold: DEFAULT_TAG_THRESHOLD,
            source_threshold: DEFAULT_SOURCE_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            estimate_samples: DEFAULT_ESTIMATE_SAMPLES,
            max_extract_attempts: DEFAULT_MAX_EXTRACT_ATTEMPTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables and defaults
    ///
    /// - `DB_EXPORT_URL`, `CACHE_DIR`, `SCRAPE_USER_AGENT`
    /// - `CONSIDER_TAGS_THRESHOLD`, `CONSIDER_SOURCE_THRESHOLD`
    /// - `PROGRESS_INTERVAL`, `ESTIMATE_SAMPLES`, `EXTRACT_MAX_ATTEMPTS`
    /// - `HTTP_TIMEOUT_SECS`, `INGEST_INTERVAL_SECS`
    ///
    /// Unparsable numbers fall back to their default.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            base_url: std::env::var("DB_EXPORT_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR)),
            user_agent: std::env::var("SCRAPE_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            tag_threshold: env_or("CONSIDER_TAGS_THRESHOLD", DEFAULT_TAG_THRESHOLD),
            source_threshold: env_or("CONSIDER_SOURCE_THRESHOLD", DEFAULT_SOURCE_THRESHOLD),
            progress_interval: env_or("PROGRESS_INTERVAL", DEFAULT_PROGRESS_INTERVAL),
            estimate_samples: env_or("ESTIMATE_SAMPLES", DEFAULT_ESTIMATE_SAMPLES),
            max_extract_attempts: env_or("EXTRACT_MAX_ATTEMPTS", DEFAULT_MAX_EXTRACT_ATTEMPTS),
            timeout_secs: env_or("HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            interval_secs: env_or("INGEST_INTERVAL_SECS", DEFAULT_INTERVAL_SECS),
        };

        config.validated()
    }

    /// Validate and normalize the configuration
    pub fn validated(mut self) -> Result<Self> {
        if self.base_url.trim().is_empty() {
            return Err(IngestError::Config("DB_EXPORT_URL cannot be empty".to_string()));
        }
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        if self.progress_interval == 0 {
            return Err(IngestError::Config("PROGRESS_INTERVAL must be greater than 0".to_string()));
        }
        if self.estimate_samples == 0 {
            return Err(IngestError::Config("ESTIMATE_SAMPLES must be greater than 0".to_string()));
        }
        if self.max_extract_attempts == 0 {
            return Err(IngestError::Config(
                "EXTRACT_MAX_ATTEMPTS must be greater than 0".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(IngestError::Config(
                "INGEST_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }

    /// URL of a dump file in the export listing
    pub fn file_url(&self, file_name: &str) -> String {
        format!("{}{}", self.base_url, file_name)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_appends_trailing_slash() {
        let config = IngestConfig {
            base_url: "http://localhost:9000/db_export".to_string(),
            ..IngestConfig::default()
        }
        .validated()
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:9000/db_export/");
        assert_eq!(
            config.file_url("tags-2024-01-01.csv.gz"),
            "http://localhost:9000/db_export/tags-2024-01-01.csv.gz"
        );
    }

    #[test]
    fn test_validated_rejects_zero_values() {
        let zero_interval = IngestConfig {
            progress_interval: 0,
            ..IngestConfig::default()
        };
        assert!(zero_interval.validated().is_err());

        let zero_attempts = IngestConfig {
            max_extract_attempts: 0,
            ..IngestConfig::default()
        };
        assert!(zero_attempts.validated().is_err());

        let empty_url = IngestConfig {
            base_url: "  ".to_string(),
            ..IngestConfig::default()
        };
        assert!(empty_url.validated().is_err());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        assert_eq!(env_or("DUMPSTAT_TEST_SURELY_UNSET", 7u64), 7);
    }
}
