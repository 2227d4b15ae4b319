//! HTTP transport for JSON endpoints.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A single GET that yields a JSON document.
///
/// One call is one attempt; retries live in
/// [`ResilientFetcher`](super::ResilientFetcher).
pub trait Transport: Send + Sync + 'static {
    fn get_json(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("Error {0}")]
    Status(u16),
    /// Request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// Connection or protocol failure
    #[error("network error: {0}")]
    Network(String),
    /// Body was not valid JSON
    #[error("invalid JSON body: {0}")]
    Decode(String),
    /// The concurrency gate was shut down
    #[error("concurrency limiter closed")]
    LimiterClosed,
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, headers: &HeaderMap) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Decode(e.to_string())
            }
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_json_parses_success_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/octocat");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"contributions":[{"date":"2024-01-15","count":3}]}"#);
            })
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("accept", "application/json".parse().unwrap());

        let body = transport
            .get_json(&server.url("/v4/octocat"), &headers)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["contributions"][0]["count"], 3);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search/users");
                then.status(403).body("rate limited");
            })
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .get_json(&server.url("/search/users"), &HeaderMap::new())
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Status(403));
    }

    #[tokio::test]
    async fn test_invalid_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(200).body("<html>");
            })
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .get_json(&server.url("/broken"), &HeaderMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }
}
