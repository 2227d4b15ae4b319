//! Population discovery.
//!
//! Requests every search page at once (through the shared limiter), keeps
//! individual accounts only, and flattens the pages in page order once all
//! of them have settled. A page that yields no data contributes nothing.

use crate::clock::Clock;
use crate::config::{Config, ConfigError, Credential};
use crate::fetch::{FetchOutcome, ResilientFetcher, Transport};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// Kind of account reported by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum AccountKind {
    User,
    Organization,
    Bot,
    #[serde(other)]
    Other,
}

/// An account found by the search, not yet aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CandidateAccount {
    #[serde(rename = "login")]
    pub handle: String,
    #[serde(rename = "avatar_url", default)]
    pub avatar_url: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
}

impl CandidateAccount {
    pub fn is_individual(&self) -> bool {
        self.kind == AccountKind::User
    }
}

/// Search endpoint response. Only `items` is consumed.
#[derive(Debug, Default, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Result of one discovery wave.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Individual accounts, page by page, in the order the API returned them
    pub candidates: Vec<CandidateAccount>,
    /// Pages whose fetch yielded no data
    pub pages_degraded: usize,
}

/// Runs the paginated account search.
pub struct Discovery<T, C> {
    fetcher: Arc<ResilientFetcher<T, C>>,
    search_url: Url,
    location: String,
    pages: u32,
    per_page: u32,
    headers: HeaderMap,
}

impl<T: Transport, C: Clock> Discovery<T, C> {
    pub fn new(
        fetcher: Arc<ResilientFetcher<T, C>>,
        config: &Config,
        credential: &Credential,
    ) -> Result<Self, ConfigError> {
        let search_url = Url::parse(&config.search_url).map_err(|e| {
            ConfigError::Invalid(format!("search_url {:?}: {}", config.search_url, e))
        })?;

        Ok(Self {
            fetcher,
            search_url,
            location: config.location.clone(),
            pages: config.pages,
            per_page: config.per_page,
            headers: search_headers(credential),
        })
    }

    /// URL of one search page (pages are numbered from 1).
    ///
    /// Query values are form-encoded, so the location may contain any
    /// character.
    pub fn page_url(&self, page: u32) -> String {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("location:{}", self.location))
            .append_pair("type", "Users")
            .append_pair("per_page", &self.per_page.to_string())
            .append_pair("page", &page.to_string());
        url.into()
    }

    /// Fetch all pages concurrently and flatten the individual accounts.
    pub async fn discover(&self) -> Result<DiscoveryReport, JoinError> {
        let mut tasks = JoinSet::new();
        for page in 1..=self.pages {
            let fetcher = self.fetcher.clone();
            let url = self.page_url(page);
            let headers = self.headers.clone();
            tasks.spawn(async move {
                let outcome = fetcher.get(&url, &headers).await;
                (page, outcome)
            });
        }

        let mut slots: Vec<Option<Vec<CandidateAccount>>> = vec![None; self.pages as usize];
        let mut pages_degraded = 0;
        while let Some(joined) = tasks.join_next().await {
            let (page, outcome) = joined?;
            let accounts = match outcome {
                FetchOutcome::Data(body) => individuals_from_page(body),
                FetchOutcome::NoData { .. } => {
                    tracing::warn!("Search page {} yielded no data", page);
                    pages_degraded += 1;
                    Vec::new()
                }
            };
            slots[(page - 1) as usize] = Some(accounts);
        }

        let candidates: Vec<CandidateAccount> = slots.into_iter().flatten().flatten().collect();
        Ok(DiscoveryReport {
            candidates,
            pages_degraded,
        })
    }
}

/// Headers for the authenticated search endpoint.
fn search_headers(credential: &Credential) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    match HeaderValue::from_str(&format!("Bearer {}", credential.token())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("Credential is not a valid header value; searching without it"),
    }
    headers
}

/// Keep the individual accounts of one search page.
///
/// Items that do not look like accounts at all are skipped.
pub fn individuals_from_page(body: Value) -> Vec<CandidateAccount> {
    let page: SearchPage = match serde_json::from_value(body) {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Unexpected search page shape: {}", e);
            return Vec::new();
        }
    };

    page.items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<CandidateAccount>(item) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::warn!("Skipping malformed search item: {}", e);
                None
            }
        })
        .filter(CandidateAccount::is_individual)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::fetch::{ConcurrencyLimiter, FetchError};
    use serde_json::json;
    use std::time::Duration;

    struct Offline;

    impl Transport for Offline {
        async fn get_json(&self, _url: &str, _headers: &HeaderMap) -> Result<Value, FetchError> {
            Err(FetchError::Network("offline".into()))
        }
    }

    fn discovery(config: &Config) -> Result<Discovery<Offline, SystemClock>, ConfigError> {
        let fetcher = Arc::new(ResilientFetcher::new(
            Offline,
            Arc::new(ConcurrencyLimiter::new(1)),
            Arc::new(SystemClock),
            1,
            Duration::from_millis(1),
        ));
        Discovery::new(fetcher, config, &Credential::new("t"))
    }

    #[test]
    fn test_page_url_with_default_location() {
        let discovery = discovery(&Config::default()).unwrap();

        assert_eq!(
            discovery.page_url(3),
            "https://api.github.com/search/users?q=location%3ASyria&type=Users&per_page=100&page=3"
        );
    }

    #[test]
    fn test_page_url_encodes_location() {
        let config = Config {
            location: "Aleppo & Homs #1+".to_string(),
            ..Config::default()
        };
        let discovery = discovery(&config).unwrap();

        let url = Url::parse(&discovery.page_url(1)).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.fragment(), None);
        assert_eq!(pairs.len(), 4);
        assert_eq!(
            pairs[0],
            ("q".to_string(), "location:Aleppo & Homs #1+".to_string())
        );
        assert_eq!(pairs[3], ("page".to_string(), "1".to_string()));
    }

    #[test]
    fn test_invalid_search_url_is_rejected() {
        let config = Config {
            search_url: "not a url".to_string(),
            ..Config::default()
        };

        assert!(matches!(discovery(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_keeps_only_individual_accounts() {
        let body = json!({
            "total_count": 4,
            "items": [
                {"login": "alice", "avatar_url": "https://x/u/1?v=4", "type": "User"},
                {"login": "acme", "avatar_url": "https://x/u/2?v=4", "type": "Organization"},
                {"login": "robo", "avatar_url": "https://x/u/3?v=4", "type": "Bot"},
                {"login": "bob", "avatar_url": "https://x/u/4?v=4", "type": "User", "score": 1.0},
                {"login": "weird", "avatar_url": "https://x/u/5?v=4", "type": "Mannequin"}
            ]
        });

        let accounts = individuals_from_page(body);

        let handles: Vec<&str> = accounts.iter().map(|a| a.handle.as_str()).collect();
        assert_eq!(handles, vec!["alice", "bob"]);
        assert_eq!(accounts[1].avatar_url, "https://x/u/4?v=4");
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let body = json!({
            "items": [
                {"avatar_url": "https://x/u/1?v=4", "type": "User"},
                "not an object",
                {"login": "carol", "type": "User"}
            ]
        });

        let accounts = individuals_from_page(body);

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].handle, "carol");
        assert_eq!(accounts[0].avatar_url, "");
    }

    #[test]
    fn test_page_without_items_is_empty() {
        assert!(individuals_from_page(json!({"message": "Bad credentials"})).is_empty());
        assert!(individuals_from_page(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_search_headers_carry_bearer_token() {
        let headers = search_headers(&Credential::new("s3cret"));
        assert_eq!(headers[ACCEPT], "application/vnd.github+json");
        assert_eq!(headers[AUTHORIZATION], "Bearer s3cret");
        assert!(headers[AUTHORIZATION].is_sensitive());
    }
}
