//! Time source for the pipeline.
//!
//! Every "now" and every suspension (retry delay, cycle interval) goes
//! through a [`Clock`], so tests can pin the date and skip the waits.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Source of wall-clock time and timed suspension.
pub trait Clock: Send + Sync + 'static {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// The real clock: `Utc::now` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
