//! Network access for the pipeline.
//!
//! This module contains:
//! - The [`Transport`] seam and its reqwest-backed implementation
//! - The process-wide [`ConcurrencyLimiter`]
//! - [`ResilientFetcher`], the retry-bounded, fail-soft GET every stage uses

pub mod limiter;
pub mod resilient;
pub mod transport;

// Re-export commonly used types
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use resilient::{FetchOutcome, ResilientFetcher};
pub use transport::{FetchError, HttpTransport, Transport};
