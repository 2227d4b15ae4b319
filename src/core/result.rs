//! Per-account results and their snapshot form.

use crate::core::aggregate::WindowCounts;
use serde::{Deserialize, Serialize};

/// Whether an account's counts were really computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOutcome {
    /// The calendar was fetched and aggregated
    Computed(WindowCounts),
    /// The calendar could not be fetched or decoded; counts read as zero
    Degraded,
}

impl AccountOutcome {
    /// Counts as published: degraded accounts publish zeros.
    pub fn counts(&self) -> WindowCounts {
        match self {
            AccountOutcome::Computed(counts) => *counts,
            AccountOutcome::Degraded => WindowCounts::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AccountOutcome::Degraded)
    }
}

/// Outcome of processing one discovered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAggregate {
    pub handle: String,
    pub avatar_url: String,
    pub outcome: AccountOutcome,
}

impl AccountAggregate {
    pub fn into_result(self) -> AggregateResult {
        let counts = self.outcome.counts();
        AggregateResult::from_counts(self.handle, self.avatar_url, counts)
    }
}

/// One snapshot entry.
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub username: String,
    pub daily_contributions: u64,
    pub monthly_contributions: u64,
    pub yearly_contributions: u64,
    pub total_contributions: u64,
    pub avatar_url: String,
}

impl AggregateResult {
    pub fn from_counts(
        username: impl Into<String>,
        avatar_url: impl Into<String>,
        counts: WindowCounts,
    ) -> Self {
        Self {
            username: username.into(),
            daily_contributions: counts.daily,
            monthly_contributions: counts.monthly,
            yearly_contributions: counts.yearly,
            total_contributions: counts.lifetime,
            avatar_url: avatar_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_account_publishes_zeros() {
        let aggregate = AccountAggregate {
            handle: "ghost".to_string(),
            avatar_url: "https://x/u/1?v=4".to_string(),
            outcome: AccountOutcome::Degraded,
        };
        assert!(aggregate.outcome.is_degraded());

        let result = aggregate.into_result();
        assert_eq!(result.username, "ghost");
        assert_eq!(result.daily_contributions, 0);
        assert_eq!(result.total_contributions, 0);
    }

    #[test]
    fn test_serialized_field_order() {
        let result = AggregateResult::from_counts(
            "أحمد",
            "https://x/u/1?v=4",
            WindowCounts {
                daily: 1,
                monthly: 2,
                yearly: 3,
                lifetime: 4,
            },
        );
        let json = serde_json::to_string(&result).unwrap();

        assert_eq!(
            json,
            r#"{"username":"أحمد","daily_contributions":1,"monthly_contributions":2,"yearly_contributions":3,"total_contributions":4,"avatar_url":"https://x/u/1?v=4"}"#
        );
    }
}
