//! Dump ingestion service
//!
//! Wires catalog, fetcher, extractor, cache and aggregation together and is
//! the surface the CLI and scheduler talk to. Calls are not reentrant: the
//! caller runs at most one cycle at a time.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::aggregate::{DatasetAggregator, Dimension};
use crate::cache::{CacheDir, CacheFile};
use crate::catalog::{resolve_latest, CatalogProvider, HtmlCatalog};
use crate::config::IngestConfig;
use crate::dataset::DatasetType;
use crate::decompress::{decompressed_path, Extractor};
use crate::error::Result;
use crate::fetch::{Fetched, Fetcher};
use crate::pipeline::{run_pass, IngestStats, PassOptions, Progress, RecordConsumer};
use crate::sink::MetricsSink;

/// How a listing file was brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Decompressed file was already present; no request was made
    AlreadyExtracted,
    /// Archive was on disk and only needed extracting
    Extracted,
    Downloaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncedFile {
    pub dataset: DatasetType,
    pub file_name: String,
    pub path: PathBuf,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub dataset: DatasetType,
    pub file_name: String,
    pub error: String,
}

/// Result of [`DumpService::ensure_latest`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub synced: Vec<SyncedFile>,
    pub failed: Vec<SyncFailure>,
    /// Listing types this service has no schema for
    pub ignored: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassFailure {
    pub dataset: DatasetType,
    pub error: String,
}

/// Result of [`DumpService::run_cycle`]
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub sync: SyncReport,
    pub passes: Vec<IngestStats>,
    pub failed: Vec<PassFailure>,
}

pub struct DumpService {
    config: IngestConfig,
    catalog: Arc<dyn CatalogProvider>,
    fetcher: Fetcher,
    extractor: Extractor,
    cache: CacheDir,
}

impl DumpService {
    /// Service backed by the export's HTML listing
    pub fn new(config: IngestConfig) -> Result<Self> {
        let catalog = Arc::new(HtmlCatalog::new(&config)?);
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: IngestConfig, catalog: Arc<dyn CatalogProvider>) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let extractor = Extractor::new(fetcher.clone(), config.max_extract_attempts);
        let cache = CacheDir::new(&config.cache_dir);

        Ok(Self {
            config,
            catalog,
            fetcher,
            extractor,
            cache,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    /// Make sure the newest dump of every known type is downloaded and extracted.
    ///
    /// A listing failure fails the call. Failures of individual files are
    /// collected in the report and the other types carry on.
    pub async fn ensure_latest(&self) -> Result<SyncReport> {
        self.cache.ensure().await?;
        let latest = resolve_latest(self.catalog.as_ref()).await?;

        let mut report = SyncReport::default();
        for (type_name, file_name) in latest {
            let Ok(dataset) = type_name.parse::<DatasetType>() else {
                debug!(dataset = %type_name, file = %file_name, "Ignoring unsupported dataset type");
                report.ignored.push(type_name);
                continue;
            };

            match self.sync_file(&file_name).await {
                Ok((path, outcome)) => {
                    debug!(dataset = %dataset, outcome = ?outcome, "Dump ready");
                    report.synced.push(SyncedFile {
                        dataset,
                        file_name,
                        path,
                        outcome,
                    });
                },
                Err(e) => {
                    error!(dataset = %dataset, file = %file_name, error = %e, "Failed to sync dump");
                    report.failed.push(SyncFailure {
                        dataset,
                        file_name,
                        error: e.to_string(),
                    });
                },
            }
        }

        info!(
            "Sync completed: {} ready, {} failed, {} ignored",
            report.synced.len(),
            report.failed.len(),
            report.ignored.len()
        );

        Ok(report)
    }

    async fn sync_file(&self, file_name: &str) -> Result<(PathBuf, SyncOutcome)> {
        let archive = self.cache.path_for(file_name);
        let target = decompressed_path(&archive);

        if tokio::fs::try_exists(&target).await? {
            return Ok((target, SyncOutcome::AlreadyExtracted));
        }

        let url = self.config.file_url(file_name);
        let outcome = match self.fetcher.download(&url, &archive).await? {
            Fetched::AlreadyPresent => SyncOutcome::Extracted,
            Fetched::Downloaded { .. } => SyncOutcome::Downloaded,
        };

        let path = self.extractor.extract(&archive, &url).await?;
        Ok((path, outcome))
    }

    /// Stream the cached dump of `dataset` into `consumer`
    pub async fn ingest(
        &self,
        dataset: DatasetType,
        consumer: &mut (dyn RecordConsumer + Send),
        observer: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<IngestStats> {
        let path = self.cache.latest_for(dataset).await?;
        run_pass(dataset, &path, PassOptions::from_config(&self.config), consumer, observer).await
    }

    /// One aggregation pass for `dataset`, published to `sink`
    pub async fn aggregate(&self, dataset: DatasetType, sink: &dyn MetricsSink) -> Result<IngestStats> {
        let mut aggregator = DatasetAggregator::for_dataset(dataset, &self.config);
        let stats = self.ingest(dataset, &mut aggregator, &mut |_: Progress| {}).await?;

        let rows = aggregator.rows();
        let series: usize = aggregator.dimensions().iter().map(Dimension::cardinality).sum();
        let published = aggregator.flush(sink);
        info!(
            dataset = %dataset,
            rows = rows,
            series = series,
            "Published {} metric families",
            published
        );

        Ok(stats)
    }

    pub async fn list_cached(&self) -> Result<Vec<CacheFile>> {
        self.cache.list_decompressed().await
    }

    pub async fn clear_cache(&self) -> Result<usize> {
        self.cache.clear().await
    }

    /// Sync, then aggregate every dataset type into `sink`, one after another.
    ///
    /// A dataset that fails keeps its previous values in the sink.
    pub async fn run_cycle(&self, sink: &dyn MetricsSink) -> Result<CycleReport> {
        info!("Starting ingestion cycle");

        let sync = self.ensure_latest().await?;
        let mut passes = Vec::new();
        let mut failed = Vec::new();

        for dataset in DatasetType::ALL {
            match self.aggregate(dataset, sink).await {
                Ok(stats) => {
                    info!("✓ {} aggregated ({} rows)", dataset, stats.rows_processed);
                    passes.push(stats);
                },
                Err(e) => {
                    warn!("✗ {} failed: {}", dataset, e);
                    failed.push(PassFailure {
                        dataset,
                        error: e.to_string(),
                    });
                },
            }
        }

        info!("Ingestion cycle completed: {} succeeded, {} failed", passes.len(), failed.len());

        Ok(CycleReport {
            sync,
            passes,
            failed,
        })
    }
}
