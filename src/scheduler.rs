//! Cycle orchestration.
//!
//! One cycle is: discover → retrieve/aggregate → anomaly correction →
//! snapshot. The scheduler runs cycles back to back with a fixed pause in
//! between, forever.

use crate::clock::Clock;
use crate::config::{Config, ConfigError, Credential};
use crate::core::{AggregateResult, AnomalyError, AnomalyFilter};
use crate::discovery::Discovery;
use crate::fetch::{ConcurrencyLimiter, ResilientFetcher, Transport};
use crate::retriever::ContributionRetriever;
use crate::snapshot::{SnapshotError, SnapshotWriter};
use crate::stats::{create_shared_log, SharedCycleLog};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use uuid::Uuid;

/// Reasons a cycle ends without writing a snapshot.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
    #[error(transparent)]
    Anomaly(#[from] AnomalyError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Summary of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Entries in the written snapshot
    pub accounts: usize,
    /// Entries published as zeros because their fetch failed
    pub accounts_degraded: usize,
    /// Search pages that yielded no data
    pub pages_degraded: usize,
    /// Anomaly corrections applied
    pub corrections: usize,
    pub snapshot_path: PathBuf,
    pub finished_at: DateTime<Utc>,
}

/// Drives the fetch → aggregate → persist pipeline.
pub struct Scheduler<T, C> {
    discovery: Discovery<T, C>,
    retriever: ContributionRetriever<T, C>,
    anomaly: AnomalyFilter,
    writer: SnapshotWriter,
    limiter: Arc<ConcurrencyLimiter>,
    clock: Arc<C>,
    interval: Duration,
    log: SharedCycleLog,
}

impl<T: Transport, C: Clock> Scheduler<T, C> {
    /// Wire every stage from one configuration.
    ///
    /// A single limiter is created here and shared by discovery and
    /// retrieval.
    pub fn new(
        config: &Config,
        credential: &Credential,
        transport: T,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let anchor_tz = config.validate()?;
        let clock = Arc::new(clock);
        let limiter = Arc::new(ConcurrencyLimiter::new(config.max_concurrency));
        let fetcher = Arc::new(ResilientFetcher::new(
            transport,
            limiter.clone(),
            clock.clone(),
            config.max_attempts,
            config.retry_delay,
        ));

        Ok(Self {
            discovery: Discovery::new(fetcher.clone(), config, credential)?,
            retriever: ContributionRetriever::new(fetcher, clock.clone(), anchor_tz, config),
            anomaly: AnomalyFilter::new(config.anomaly_corrections.clone()),
            writer: SnapshotWriter::new(&config.snapshot_path, &config.backup_path),
            limiter,
            clock,
            interval: config.cycle_interval,
            log: create_shared_log(),
        })
    }

    /// Use `log` for cycle statistics instead of a fresh in-memory one.
    pub fn with_log(mut self, log: SharedCycleLog) -> Self {
        self.log = log;
        self
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    pub fn log(&self) -> &SharedCycleLog {
        &self.log
    }

    pub fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    /// Run one full cycle and persist its snapshot.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let cycle_id = Uuid::new_v4();
        tracing::info!(%cycle_id, "⏳ Fetching users...");

        let discovered = self.discovery.discover().await?;
        tracing::info!(%cycle_id, "✅ Got {} users.", discovered.candidates.len());

        let aggregates = self.retriever.retrieve_all(discovered.candidates).await?;
        let accounts_degraded = aggregates
            .iter()
            .filter(|a| a.outcome.is_degraded())
            .count();

        let mut results: Vec<AggregateResult> =
            aggregates.into_iter().map(|a| a.into_result()).collect();
        let corrections = self.anomaly.apply(&mut results)?;

        let written = self.writer.write(&results)?;
        tracing::info!(
            %cycle_id,
            "✅ Data written to {} ({} entries, {} degraded, backup: {})",
            written.path.display(),
            written.entries,
            accounts_degraded,
            written.backed_up
        );

        Ok(CycleReport {
            cycle_id,
            accounts: written.entries,
            accounts_degraded,
            pages_degraded: discovered.pages_degraded,
            corrections,
            snapshot_path: written.path,
            finished_at: self.clock.now(),
        })
    }

    /// Run one cycle, record it, then wait for the interval.
    ///
    /// A failed cycle is logged and skipped; the wait happens either way.
    pub async fn tick(&self) -> Option<CycleReport> {
        let report = match self.run_cycle().await {
            Ok(report) => {
                self.log.record_completed(&report);
                Some(report)
            }
            Err(e) => {
                tracing::error!("Cycle aborted, no snapshot written: {}", e);
                self.log.record_failed();
                None
            }
        };

        if let Err(e) = self.log.save() {
            tracing::warn!("Could not save cycle stats: {}", e);
        }

        tracing::info!(
            "Waiting {} minutes until the next cycle...",
            self.interval.as_secs() / 60
        );
        self.clock.sleep(self.interval).await;
        report
    }

    /// Run cycles forever. Only ends when the task is dropped.
    pub async fn run_forever(&self) {
        loop {
            self.tick().await;
        }
    }
}
