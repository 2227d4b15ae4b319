//! Retry-bounded, fail-soft GET.
//!
//! Exhausting the attempt budget is an expected outcome: the caller gets
//! [`FetchOutcome::NoData`] and degrades its own result instead of aborting
//! the batch.

use super::limiter::ConcurrencyLimiter;
use super::transport::{FetchError, Transport};
use crate::clock::Clock;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Result of a resilient fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// A successful attempt produced a payload
    Data(T),
    /// Every attempt failed
    NoData { attempts: u32, last_error: FetchError },
}

impl<T> FetchOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FetchOutcome::Data(value) => Some(value),
            FetchOutcome::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, FetchOutcome::NoData { .. })
    }
}

/// GET with a fixed attempt budget and a fixed delay after each failure.
///
/// Every call holds one limiter slot from before the first attempt until
/// the last attempt (and its delay) has settled.
pub struct ResilientFetcher<T, C> {
    transport: T,
    limiter: Arc<ConcurrencyLimiter>,
    clock: Arc<C>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<T: Transport, C: Clock> ResilientFetcher<T, C> {
    pub fn new(
        transport: T,
        limiter: Arc<ConcurrencyLimiter>,
        clock: Arc<C>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            transport,
            limiter,
            clock,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// The shared concurrency gate.
    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    /// Fetch `url`, retrying on any failure.
    pub async fn get(&self, url: &str, headers: &HeaderMap) -> FetchOutcome<Value> {
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!("[!] Limiter closed, skipping {}", url);
                return FetchOutcome::NoData {
                    attempts: 0,
                    last_error: FetchError::LimiterClosed,
                };
            }
        };

        let mut attempt = 1;
        loop {
            let err = match self.transport.get_json(url, headers).await {
                Ok(value) => return FetchOutcome::Data(value),
                Err(err) => err,
            };
            tracing::warn!(
                "[!] {} for {} (attempt {}/{})",
                err,
                url,
                attempt,
                self.max_attempts
            );
            self.clock.sleep(self.retry_delay).await;

            if attempt >= self.max_attempts {
                return FetchOutcome::NoData {
                    attempts: attempt,
                    last_error: err,
                };
            }
            attempt += 1;
        }
    }
}
