//! Core aggregation logic for the contributors updater.
//!
//! This module contains:
//! - Window aggregation of contribution calendars
//! - The per-account outcome and snapshot entry types
//! - The known-bot anomaly correction

pub mod aggregate;
pub mod anomaly;
pub mod result;

// Re-export commonly used types
pub use aggregate::{aggregate, ContributionCalendar, ContributionRecord, WindowCounts};
pub use anomaly::{extract_account_id, AnomalyError, AnomalyFilter};
pub use result::{AccountAggregate, AccountOutcome, AggregateResult};
