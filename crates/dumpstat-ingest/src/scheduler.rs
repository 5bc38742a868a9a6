//! Fixed-interval ingestion loop
//!
//! Each cycle is awaited before the next tick is taken and missed ticks are
//! skipped, so two cycles never overlap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::service::DumpService;
use crate::sink::MetricsSink;

pub struct Scheduler {
    service: Arc<DumpService>,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(service: Arc<DumpService>, sink: Arc<dyn MetricsSink>, interval: Duration) -> Self {
        Self {
            service,
            sink,
            interval,
        }
    }

    /// Run cycles until `shutdown` resolves; the first one starts immediately.
    ///
    /// Returns the number of cycles started. A failed cycle is logged and the
    /// loop waits for the next tick. A cycle still running when `shutdown`
    /// resolves is abandoned; downloads and extractions are only renamed into
    /// place once complete, so the next run picks up where it left off.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            cycles += 1;
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(cycle = cycles, "Shutdown requested, abandoning cycle in progress");
                    break;
                }
                result = self.service.run_cycle(self.sink.as_ref()) => match result {
                    Ok(report) => info!(
                        cycle = cycles,
                        succeeded = report.passes.len(),
                        failed = report.failed.len(),
                        "Cycle finished, next in {}s",
                        self.interval.as_secs()
                    ),
                    Err(e) => error!(cycle = cycles, "Ingestion cycle failed: {}", e),
                }
            }
        }

        info!("Scheduler stopping after {} cycles", cycles);
        cycles
    }

    /// Run forever in a background task
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Ingestion scheduler started");
            self.run_until(std::future::pending()).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogProvider, StaticCatalog};
    use crate::config::IngestConfig;
    use crate::error::Result;
    use crate::sink::MetricsRegistry;
    use async_trait::async_trait;

    /// A listing that never answers
    struct HangingCatalog;

    #[async_trait]
    impl CatalogProvider for HangingCatalog {
        async fn list(&self) -> Result<Vec<String>> {
            std::future::pending().await
        }
    }

    fn scheduler(catalog: Arc<dyn CatalogProvider>) -> (Scheduler, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = IngestConfig {
            cache_dir: dir.path().to_path_buf(),
            ..IngestConfig::default()
        };
        let service = DumpService::with_catalog(config, catalog).unwrap();
        let scheduler = Scheduler::new(
            Arc::new(service),
            Arc::new(MetricsRegistry::new()),
            Duration::from_secs(60),
        );
        (scheduler, dir)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_on_interval_until_shutdown() {
        let (scheduler, _dir) = scheduler(Arc::new(StaticCatalog::default()));

        let cycles = scheduler
            .run_until(tokio::time::sleep(Duration::from_secs(150)))
            .await;

        assert!((1..=3).contains(&cycles), "ran {} cycles", cycles);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_a_running_cycle() {
        let (scheduler, _dir) = scheduler(Arc::new(HangingCatalog));

        let cycles = tokio::time::timeout(
            Duration::from_secs(30),
            scheduler.run_until(tokio::time::sleep(Duration::from_secs(5))),
        )
        .await
        .expect("scheduler kept waiting on the cycle");

        assert_eq!(cycles, 1);
    }
}
