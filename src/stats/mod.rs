//! Cycle statistics for the contributors updater.
//!
//! Tracks how many cycles ran, how many accounts were published and how
//! many of them had to be degraded, so an operator can tell "really zero"
//! from "fetch failed" over time.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, CycleLog, CycleStats, SharedCycleLog,
};
