//! Cumulative cycle statistics.
//!
//! Counters survive restarts through a small JSON file next to the other
//! runtime data.

use crate::scheduler::CycleReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Process-wide cycle counters.
#[derive(Debug)]
pub struct CycleLog {
    /// Cycles that wrote a snapshot
    cycles_completed: AtomicU64,
    /// Cycles aborted before writing
    cycles_failed: AtomicU64,
    /// Accounts present in written snapshots
    accounts_processed: AtomicU64,
    /// Accounts published with zero counts because their fetch failed
    accounts_degraded: AtomicU64,
    /// Search pages that yielded no data
    pages_degraded: AtomicU64,
    /// Anomaly corrections applied
    corrections_applied: AtomicU64,
    /// End of the last completed cycle
    last_cycle_at: Mutex<Option<DateTime<Utc>>>,
    /// Process start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl CycleLog {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            accounts_processed: AtomicU64::new(0),
            accounts_degraded: AtomicU64::new(0),
            pages_degraded: AtomicU64::new(0),
            corrections_applied: AtomicU64::new(0),
            last_cycle_at: Mutex::new(None),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a cycle log backed by `path`, loading earlier totals.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous cycle stats: {}", e);
        }

        log
    }

    /// Record a cycle that wrote its snapshot.
    pub fn record_completed(&self, report: &CycleReport) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.accounts_processed
            .fetch_add(report.accounts as u64, Ordering::Relaxed);
        self.accounts_degraded
            .fetch_add(report.accounts_degraded as u64, Ordering::Relaxed);
        self.pages_degraded
            .fetch_add(report.pages_degraded as u64, Ordering::Relaxed);
        self.corrections_applied
            .fetch_add(report.corrections as u64, Ordering::Relaxed);
        if let Ok(mut last) = self.last_cycle_at.lock() {
            *last = Some(report.finished_at);
        }
    }

    /// Record a cycle that was aborted.
    pub fn record_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CycleStats {
        CycleStats {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            accounts_processed: self.accounts_processed.load(Ordering::Relaxed),
            accounts_degraded: self.accounts_degraded.load(Ordering::Relaxed),
            pages_degraded: self.pages_degraded.load(Ordering::Relaxed),
            corrections_applied: self.corrections_applied.load(Ordering::Relaxed),
            last_cycle_at: self.last_cycle_at.lock().ok().and_then(|last| *last),
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let last = stats
            .last_cycle_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        format!(
            "Cycle Statistics:\n\
             - Cycles completed: {}\n\
             - Cycles failed: {}\n\
             - Accounts processed: {}\n\
             - Accounts degraded to zero: {}\n\
             - Search pages without data: {}\n\
             - Anomaly corrections applied: {}\n\
             - Last completed cycle: {}",
            stats.cycles_completed,
            stats.cycles_failed,
            stats.accounts_processed,
            stats.accounts_degraded,
            stats.pages_degraded,
            stats.corrections_applied,
            last
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                cycles_completed: stats.cycles_completed,
                cycles_failed: stats.cycles_failed,
                accounts_processed: stats.accounts_processed,
                accounts_degraded: stats.accounts_degraded,
                pages_degraded: stats.pages_degraded,
                corrections_applied: stats.corrections_applied,
                last_cycle_at: stats.last_cycle_at,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.cycles_completed
                    .store(persisted.cycles_completed, Ordering::Relaxed);
                self.cycles_failed
                    .store(persisted.cycles_failed, Ordering::Relaxed);
                self.accounts_processed
                    .store(persisted.accounts_processed, Ordering::Relaxed);
                self.accounts_degraded
                    .store(persisted.accounts_degraded, Ordering::Relaxed);
                self.pages_degraded
                    .store(persisted.pages_degraded, Ordering::Relaxed);
                self.corrections_applied
                    .store(persisted.corrections_applied, Ordering::Relaxed);
                *self.last_cycle_at.get_mut().map_err(|_| {
                    std::io::Error::other("cycle stats lock poisoned")
                })? = persisted.last_cycle_at;
            }
        }
        Ok(())
    }
}

impl Default for CycleLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of cycle statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleStats {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub accounts_processed: u64,
    pub accounts_degraded: u64,
    pub pages_degraded: u64,
    pub corrections_applied: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    cycles_completed: u64,
    cycles_failed: u64,
    accounts_processed: u64,
    accounts_degraded: u64,
    pages_degraded: u64,
    corrections_applied: u64,
    #[serde(default)]
    last_cycle_at: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared cycle log.
pub type SharedCycleLog = Arc<CycleLog>;

/// Create a new shared cycle log.
pub fn create_shared_log() -> SharedCycleLog {
    Arc::new(CycleLog::new())
}

/// Create a new shared cycle log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedCycleLog {
    Arc::new(CycleLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn report(accounts: usize, degraded: usize) -> CycleReport {
        CycleReport {
            cycle_id: Uuid::new_v4(),
            accounts,
            accounts_degraded: degraded,
            pages_degraded: 1,
            corrections: 1,
            snapshot_path: PathBuf::from("contributors.json"),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_cycle_log_counting() {
        let log = CycleLog::new();

        log.record_completed(&report(10, 2));
        log.record_completed(&report(5, 0));
        log.record_failed();

        let stats = log.stats();
        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.cycles_failed, 1);
        assert_eq!(stats.accounts_processed, 15);
        assert_eq!(stats.accounts_degraded, 2);
        assert_eq!(stats.pages_degraded, 2);
        assert!(stats.last_cycle_at.is_some());
    }

    #[test]
    fn test_stats_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/stats.json");

        let log = CycleLog::with_persistence(path.clone());
        log.record_completed(&report(7, 1));
        log.save().unwrap();

        let reloaded = CycleLog::with_persistence(path);
        let stats = reloaded.stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.accounts_processed, 7);
        assert!(stats.last_cycle_at.is_some());
    }

    #[test]
    fn test_summary_format() {
        let log = CycleLog::new();
        let summary = log.summary();

        assert!(summary.contains("Cycles completed: 0"));
        assert!(summary.contains("Last completed cycle: never"));
    }
}
