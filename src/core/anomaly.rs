//! Known-bot contribution correction.
//!
//! Some accounts carry a large block of automated contributions. Their
//! numeric id is read from the avatar URL (`.../u/<id>?v=4`) and the known
//! amount is subtracted from the lifetime total.

use crate::core::result::AggregateResult;
use std::collections::BTreeMap;
use thiserror::Error;

const ID_MARKER: &str = "/u/";

/// Anomaly correction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnomalyError {
    /// The avatar reference has no `/u/<digits>` segment.
    #[error("avatar reference for {handle} has no account id: {avatar_url:?}")]
    MissingIdentifier { handle: String, avatar_url: String },
}

/// Extract the numeric account id from an avatar URL.
///
/// The id is the first run of digits after `/u/` that is followed by `/`,
/// `?` or the end of the string.
pub fn extract_account_id(avatar_url: &str) -> Option<u64> {
    let mut rest = avatar_url;
    while let Some(pos) = rest.find(ID_MARKER) {
        let after = &rest[pos + ID_MARKER.len()..];
        let digits_len = after.bytes().take_while(u8::is_ascii_digit).count();
        let terminated = matches!(
            after.as_bytes().get(digits_len).copied(),
            None | Some(b'/' | b'?')
        );

        if digits_len > 0 && terminated {
            if let Ok(id) = after[..digits_len].parse() {
                return Some(id);
            }
        }
        rest = &rest[pos + 1..];
    }
    None
}

/// Subtracts fixed counts from flagged accounts' lifetime totals.
#[derive(Debug, Clone, Default)]
pub struct AnomalyFilter {
    corrections: BTreeMap<u64, u64>,
}

impl AnomalyFilter {
    pub fn new(corrections: BTreeMap<u64, u64>) -> Self {
        Self { corrections }
    }

    /// Correct one result in place.
    ///
    /// Returns whether a correction was applied. A result whose avatar
    /// reference carries no account id is an error.
    pub fn correct(&self, result: &mut AggregateResult) -> Result<bool, AnomalyError> {
        let id = extract_account_id(&result.avatar_url).ok_or_else(|| {
            AnomalyError::MissingIdentifier {
                handle: result.username.clone(),
                avatar_url: result.avatar_url.clone(),
            }
        })?;

        match self.corrections.get(&id) {
            Some(&amount) => {
                result.total_contributions = result.total_contributions.saturating_sub(amount);
                tracing::info!(
                    "Removed {} automated contributions from {}",
                    amount,
                    result.username
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Correct every result, stopping at the first unreadable avatar.
    ///
    /// Returns the number of corrected results.
    pub fn apply(&self, results: &mut [AggregateResult]) -> Result<usize, AnomalyError> {
        let mut corrected = 0;
        for result in results.iter_mut() {
            if self.correct(result)? {
                corrected += 1;
            }
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::WindowCounts;

    fn result(handle: &str, avatar_url: &str, lifetime: u64) -> AggregateResult {
        AggregateResult::from_counts(
            handle,
            avatar_url,
            WindowCounts {
                daily: 1,
                monthly: 2,
                yearly: 3,
                lifetime,
            },
        )
    }

    #[test]
    fn test_extract_account_id() {
        assert_eq!(
            extract_account_id("https://avatars.githubusercontent.com/u/30838534?v=4"),
            Some(30838534)
        );
        assert_eq!(
            extract_account_id("https://avatars.githubusercontent.com/u/42/"),
            Some(42)
        );
        assert_eq!(
            extract_account_id("https://avatars.githubusercontent.com/u/42"),
            Some(42)
        );
    }

    #[test]
    fn test_extract_skips_unterminated_segments() {
        assert_eq!(extract_account_id("https://x/u/12abc/u/34?s=1"), Some(34));
        assert_eq!(extract_account_id("https://x/u/abc"), None);
        assert_eq!(extract_account_id("https://x/users/12"), None);
        assert_eq!(extract_account_id(""), None);
    }

    #[test]
    fn test_flagged_account_loses_exactly_the_mapped_amount() {
        let filter = AnomalyFilter::new(BTreeMap::from([(30838534, 23933)]));
        let mut results = vec![
            result(
                "flagged",
                "https://avatars.githubusercontent.com/u/30838534?v=4",
                30000,
            ),
            result("clean", "https://avatars.githubusercontent.com/u/7?v=4", 500),
        ];

        let corrected = filter.apply(&mut results).unwrap();

        assert_eq!(corrected, 1);
        assert_eq!(results[0].total_contributions, 30000 - 23933);
        assert_eq!(results[0].daily_contributions, 1);
        assert_eq!(results[0].monthly_contributions, 2);
        assert_eq!(results[0].yearly_contributions, 3);
        assert_eq!(results[1].total_contributions, 500);
    }

    #[test]
    fn test_correction_saturates_at_zero() {
        let filter = AnomalyFilter::new(BTreeMap::from([(5, 100)]));
        let mut r = result("small", "https://x/u/5?v=4", 40);

        assert!(filter.correct(&mut r).unwrap());
        assert_eq!(r.total_contributions, 0);
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let filter = AnomalyFilter::default();
        let mut results = vec![result("broken", "https://example.com/avatar.png", 10)];

        let err = filter.apply(&mut results).unwrap_err();

        assert_eq!(
            err,
            AnomalyError::MissingIdentifier {
                handle: "broken".to_string(),
                avatar_url: "https://example.com/avatar.png".to_string(),
            }
        );
    }
}
