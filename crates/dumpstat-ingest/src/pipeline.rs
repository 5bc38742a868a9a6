//! One streaming pass over a decompressed dump
//!
//! Rows are pulled from a [`RecordReader`] and handed to a consumer one at a
//! time. The row count estimate runs first on a blocking thread and only
//! feeds progress percentages.

use dumpstat_common::units::percent;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::csv::{Record, RecordReader};
use crate::dataset::DatasetType;
use crate::error::Result;
use crate::estimate::estimate_rows;

/// Consumer faults logged individually before only the total is reported
pub const LOGGED_FAULTS: u64 = 10;

/// Receives every record of a pass
pub trait RecordConsumer {
    /// Process one record; an error rejects only this record
    fn consume(&mut self, record: &Record) -> Result<()>;
}

impl<F> RecordConsumer for F
where
    F: FnMut(&Record) -> Result<()>,
{
    fn consume(&mut self, record: &Record) -> Result<()> {
        self(record)
    }
}

/// Progress observation emitted during a pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub rows_processed: u64,
    pub estimated_rows: u64,
    pub percent: f64,
}

impl Progress {
    pub fn new(rows_processed: u64, estimated_rows: u64) -> Self {
        Self {
            rows_processed,
            estimated_rows,
            percent: percent(rows_processed, estimated_rows),
        }
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub dataset: DatasetType,
    pub path: PathBuf,
    /// Records delivered to the consumer, rejected ones included
    pub rows_processed: u64,
    pub rows_rejected: u64,
    pub estimated_rows: u64,
    pub elapsed: Duration,
}

/// Tunables of a pass
#[derive(Debug, Clone, Copy)]
pub struct PassOptions {
    pub progress_interval: u64,
    pub estimate_samples: usize,
}

impl PassOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            progress_interval: config.progress_interval.max(1),
            estimate_samples: config.estimate_samples,
        }
    }
}

/// Stream every record of `path` into `consumer`.
///
/// Consumer errors are counted and logged (the first [`LOGGED_FAULTS`]
/// individually) and never abort the pass. `observer` sees a [`Progress`]
/// every `progress_interval` rows and once more for the final row.
pub async fn run_pass(
    dataset: DatasetType,
    path: &Path,
    options: PassOptions,
    consumer: &mut (dyn RecordConsumer + Send),
    observer: &mut (dyn FnMut(Progress) + Send),
) -> Result<IngestStats> {
    let started = Instant::now();
    let interval = options.progress_interval.max(1);

    let estimated_rows = tokio::task::spawn_blocking({
        let path = path.to_path_buf();
        let samples = options.estimate_samples;
        move || estimate_rows(&path, samples)
    })
    .await??;

    info!(
        dataset = %dataset,
        estimated_rows = estimated_rows,
        "Streaming {} (~{} rows)",
        path.display(),
        estimated_rows
    );

    let mut reader = RecordReader::open(path).await?;
    let mut rows_processed = 0u64;
    let mut rows_rejected = 0u64;
    let mut last_reported = 0u64;

    while let Some(record) = reader.next_record().await? {
        rows_processed += 1;
        if rows_processed == 1 {
            check_columns(dataset, &record);
        }

        if let Err(e) = consumer.consume(&record) {
            rows_rejected += 1;
            if rows_rejected <= LOGGED_FAULTS {
                warn!(dataset = %dataset, row = rows_processed, error = %e, "Record rejected");
            }
        }

        if rows_processed % interval == 0 {
            report(dataset, Progress::new(rows_processed, estimated_rows), observer);
            last_reported = rows_processed;
        }
    }

    if rows_processed > 0 && last_reported != rows_processed {
        report(dataset, Progress::new(rows_processed, estimated_rows), observer);
    }

    if rows_rejected > LOGGED_FAULTS {
        warn!(
            dataset = %dataset,
            rejected = rows_rejected,
            "{} records rejected in total ({} logged)",
            rows_rejected,
            LOGGED_FAULTS
        );
    }

    let stats = IngestStats {
        dataset,
        path: path.to_path_buf(),
        rows_processed,
        rows_rejected,
        estimated_rows,
        elapsed: started.elapsed(),
    };

    info!(
        dataset = %dataset,
        rows = rows_processed,
        rejected = rows_rejected,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "Finished streaming {}",
        dataset
    );

    Ok(stats)
}

/// Warn once when the dump lacks columns the breakdowns read
fn check_columns(dataset: DatasetType, record: &Record) {
    let missing: Vec<&str> = dataset
        .columns()
        .iter()
        .copied()
        .filter(|column| record.header().position(column).is_none())
        .collect();

    if !missing.is_empty() {
        warn!(
            dataset = %dataset,
            missing = ?missing,
            "Dump header lacks {} expected columns, they read as empty",
            missing.len()
        );
    }
}

fn report(dataset: DatasetType, progress: Progress, observer: &mut (dyn FnMut(Progress) + Send)) {
    info!(
        dataset = %dataset,
        rows = progress.rows_processed,
        estimated = progress.estimated_rows,
        "Progress: {:.1}%",
        progress.percent
    );
    observer(progress);
}
