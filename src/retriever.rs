//! Contribution retrieval and per-account aggregation.
//!
//! Every candidate gets its own task; all tasks share the process-wide
//! limiter through the fetcher. Results are slotted by candidate index, so
//! the output order matches discovery order regardless of completion order.

use crate::clock::Clock;
use crate::config::Config;
use crate::core::{aggregate, AccountAggregate, AccountOutcome, ContributionCalendar};
use crate::discovery::CandidateAccount;
use crate::fetch::{FetchOutcome, ResilientFetcher, Transport};
use chrono_tz::Tz;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// Fetches and aggregates contribution calendars.
pub struct ContributionRetriever<T, C> {
    fetcher: Arc<ResilientFetcher<T, C>>,
    clock: Arc<C>,
    anchor_tz: Tz,
    base_url: String,
}

impl<T: Transport, C: Clock> ContributionRetriever<T, C> {
    pub fn new(
        fetcher: Arc<ResilientFetcher<T, C>>,
        clock: Arc<C>,
        anchor_tz: Tz,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            clock,
            anchor_tz,
            base_url: config.contributions_url.trim_end_matches('/').to_string(),
        }
    }

    /// Calendar URL for one handle.
    pub fn calendar_url(&self, handle: &str) -> String {
        format!("{}/{}", self.base_url, handle)
    }

    /// Process every candidate concurrently.
    ///
    /// Exactly one aggregate is returned per candidate, in candidate order.
    pub async fn retrieve_all(
        &self,
        candidates: Vec<CandidateAccount>,
    ) -> Result<Vec<AccountAggregate>, JoinError> {
        let total = candidates.len();
        let mut tasks = JoinSet::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let clock = self.clock.clone();
            let url = self.calendar_url(&candidate.handle);
            let anchor_tz = self.anchor_tz;
            tasks.spawn(async move {
                tracing::info!("Processing {}...", candidate.handle);
                let outcome = fetcher.get(&url, &HeaderMap::new()).await;
                let outcome = match outcome {
                    FetchOutcome::Data(body) => {
                        // "now" is taken per account, at the moment its data arrives.
                        let now = clock.now().with_timezone(&anchor_tz);
                        account_outcome(&candidate.handle, body, now)
                    }
                    FetchOutcome::NoData { attempts, .. } => {
                        tracing::warn!(
                            "No contribution data for {} after {} attempts",
                            candidate.handle,
                            attempts
                        );
                        AccountOutcome::Degraded
                    }
                };
                let aggregate = AccountAggregate {
                    handle: candidate.handle,
                    avatar_url: candidate.avatar_url,
                    outcome,
                };
                (index, aggregate)
            });
        }

        let mut slots: Vec<Option<AccountAggregate>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let (index, aggregate) = joined?;
            slots[index] = Some(aggregate);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Decode a calendar payload and aggregate it against `now`.
fn account_outcome(handle: &str, body: Value, now: chrono::DateTime<Tz>) -> AccountOutcome {
    match serde_json::from_value::<ContributionCalendar>(body) {
        Ok(calendar) => AccountOutcome::Computed(aggregate(&calendar.contributions, now)),
        Err(e) => {
            tracing::warn!("Unexpected calendar shape for {}: {}", handle, e);
            AccountOutcome::Degraded
        }
    }
}
