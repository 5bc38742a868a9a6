//! dumpstat ingest library
//!
//! Periodic ingestion of the e621 bulk database export into dimensional
//! counters.
//!
//! # Pipeline
//!
//! - **Catalog**: newest `<type>-YYYY-MM-DD.csv.gz` per dataset type from the listing
//! - **Fetch / Decompress**: idempotent download and extraction, re-fetching corrupt archives
//! - **Estimate**: sparse-sampling row count for progress percentages
//! - **CSV**: chunk-boundary-safe line reassembly and a quote-aware tokenizer
//! - **Aggregate**: per-dataset breakdowns flushed to a [`sink::MetricsSink`] once per pass
//!
//! Dataset types are processed one at a time; memory per pass is one carry-over
//! buffer plus one read chunk, plus the aggregation maps.
//!
//! # Consistency
//!
//! Every pass replaces its metric families wholesale. When a cycle fails part
//! way, families already flushed hold the new values while the rest still hold
//! the previous cycle's values until the next successful pass.
//!
//! # Example
//!
//! ```no_run
//! use dumpstat_ingest::{DumpService, IngestConfig, MetricsRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = DumpService::new(IngestConfig::from_env()?)?;
//!     let registry = MetricsRegistry::new();
//!     service.run_cycle(&registry).await?;
//!     println!("{}", serde_json::to_string_pretty(&registry.snapshot())?);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod csv;
pub mod dataset;
pub mod decompress;
pub mod error;
pub mod estimate;
pub mod fetch;
pub mod pipeline;
pub mod scheduler;
pub mod service;
pub mod sink;

pub use config::IngestConfig;
pub use dataset::DatasetType;
pub use error::{IngestError, Result};
pub use service::DumpService;
pub use sink::{MetricFamily, MetricsRegistry, MetricsSink};
