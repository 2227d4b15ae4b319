//! Contribution window aggregation.
//!
//! Records are bucketed against "now" in the anchor timezone. The windows
//! cascade: a record only reaches the monthly bucket after matching the year,
//! and only reaches the daily bucket after matching the month.

use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Date format of the contribution calendar.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One raw entry of an account's contribution calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    /// Calendar date as sent by the API (`YYYY-MM-DD`). `None` when the
    /// field is missing or not a string.
    #[serde(default, deserialize_with = "date_or_none")]
    pub date: Option<String>,
    /// Contributions on that day
    pub count: u64,
}

impl ContributionRecord {
    pub fn new(date: impl Into<String>, count: u64) -> Self {
        Self {
            date: Some(date.into()),
            count,
        }
    }

    /// Parse the date, or `None` if it is not a valid calendar date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let date = self.date.as_deref()?;
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
    }
}

fn date_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(date) => Ok(Some(date)),
        _ => Ok(None),
    }
}

/// Payload of the contribution-calendar endpoint.
///
/// Only the `contributions` list is consumed; other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributionCalendar {
    #[serde(default)]
    pub contributions: Vec<ContributionRecord>,
}

/// Per-window contribution totals for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounts {
    pub daily: u64,
    pub monthly: u64,
    pub yearly: u64,
    pub lifetime: u64,
}

impl WindowCounts {
    /// Add one record dated `date` against `now`.
    fn add(&mut self, date: NaiveDate, count: u64, now: NaiveDate) {
        self.lifetime += count;

        if date.year() == now.year() {
            self.yearly += count;
            if date.month() == now.month() {
                self.monthly += count;
                if date.day() == now.day() {
                    self.daily += count;
                }
            }
        }
    }

    /// Check `daily <= monthly <= yearly <= lifetime`.
    pub fn is_nested(&self) -> bool {
        self.daily <= self.monthly && self.monthly <= self.yearly && self.yearly <= self.lifetime
    }
}

/// Aggregate `records` against `now`.
///
/// `now` is already expressed in the anchor timezone; only its calendar
/// date matters. Records with an unparsable date are skipped.
pub fn aggregate(records: &[ContributionRecord], now: DateTime<Tz>) -> WindowCounts {
    let today = now.date_naive();
    let mut counts = WindowCounts::default();

    for record in records {
        let Some(date) = record.parsed_date() else {
            tracing::debug!("Skipping record with unparsable date {:?}", record.date);
            continue;
        };
        counts.add(date, record.count, today);
    }

    counts
}
