//! Contributors Updater - periodic contribution leaderboard snapshots.
//!
//! This library discovers accounts by location, fetches each account's
//! contribution calendar, aggregates it into daily/monthly/yearly/lifetime
//! windows, and publishes the result set as a JSON snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Scheduler (loop)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────┐   ┌─────────┐   ┌─────────┐ │
//! │  │ Discovery │──▶│  Retriever  │──▶│ Anomaly │──▶│Snapshot │ │
//! │  │ (5 pages) │   │ (per user)  │   │ filter  │   │ writer  │ │
//! │  └───────────┘   └─────────────┘   └─────────┘   └─────────┘ │
//! │        │                │                                    │
//! │        ▼                ▼                                    │
//! │  ┌──────────────────────────────┐                            │
//! │  │ Resilient fetch + limiter(5) │                            │
//! │  └──────────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use contributors_updater::{Config, Credential, HttpTransport, Scheduler, SystemClock};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let credential = Credential::from_env()?;
//! let transport = HttpTransport::new(config.request_timeout)?;
//! let scheduler = Scheduler::new(&config, &credential, transport, SystemClock)?;
//!
//! let report = scheduler.run_cycle().await?;
//! println!("{} accounts written", report.accounts);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod core;
pub mod discovery;
pub mod fetch;
pub mod retriever;
pub mod scheduler;
pub mod snapshot;
pub mod stats;

// Re-export key types at crate root for convenience
pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError, Credential};
pub use core::{AccountOutcome, AggregateResult, AnomalyFilter, WindowCounts};
pub use discovery::{CandidateAccount, Discovery};
pub use fetch::{ConcurrencyLimiter, FetchError, FetchOutcome, HttpTransport, Transport};
pub use retriever::ContributionRetriever;
pub use scheduler::{CycleError, CycleReport, Scheduler};
pub use snapshot::{SnapshotError, SnapshotWriter};
pub use stats::{CycleLog, SharedCycleLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
