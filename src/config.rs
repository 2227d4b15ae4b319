//! Configuration for the contributors updater.
//!
//! The defaults are the production constants. An optional JSON file can
//! override any of them; the result is built once at startup and handed to
//! every component.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API token.
pub const CREDENTIAL_ENV: &str = "GITHUB_TOKEN";

/// Directory name used under the platform config and data dirs.
pub const APP_DIR: &str = "contributors-updater";

/// Main configuration for the updater.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of search pages requested per cycle
    pub pages: u32,

    /// Results per search page
    pub per_page: u32,

    /// Location predicate for the account search
    pub location: String,

    /// Maximum simultaneous in-flight requests across the whole process
    pub max_concurrency: usize,

    /// Attempts per request before giving up with "no data"
    pub max_attempts: u32,

    /// Wait after each failed attempt
    #[serde(with = "duration_serde")]
    pub retry_delay: Duration,

    /// Per-request timeout
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// Pause between two cycles
    #[serde(with = "duration_serde")]
    pub cycle_interval: Duration,

    /// IANA zone that daily/monthly/yearly windows are anchored to
    pub anchor_timezone: String,

    /// Account search endpoint
    pub search_url: String,

    /// Contribution calendar endpoint (handle is appended as a path segment)
    pub contributions_url: String,

    /// Primary snapshot file
    pub snapshot_path: PathBuf,

    /// Previous snapshot, kept one cycle back
    pub backup_path: PathBuf,

    /// Path for storing cycle statistics
    pub data_path: PathBuf,

    /// Known automated contribution counts, keyed by numeric account id
    pub anomaly_corrections: BTreeMap<u64, u64>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            pages: 5,
            per_page: 100,
            location: "Syria".to_string(),
            max_concurrency: 5,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            cycle_interval: Duration::from_secs(2 * 60 * 60),
            anchor_timezone: "Asia/Damascus".to_string(),
            search_url: "https://api.github.com/search/users".to_string(),
            contributions_url: "https://github-contributions-api.jogruber.de/v4".to_string(),
            snapshot_path: PathBuf::from("./public/contributors.json"),
            backup_path: PathBuf::from("./public/contributors_backup.json"),
            data_path: data_dir,
            anomaly_corrections: BTreeMap::from([(30838534, 23933)]),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit JSON file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Path of the persisted cycle statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Check the constants and resolve the anchor timezone.
    pub fn validate(&self) -> Result<Tz, ConfigError> {
        if self.pages == 0 {
            return Err(ConfigError::Invalid("pages must be at least 1".into()));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("per_page must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        self.anchor_tz()
    }

    /// Parse the anchor timezone name.
    pub fn anchor_tz(&self) -> Result<Tz, ConfigError> {
        self.anchor_timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.anchor_timezone.clone()))
    }
}

/// Bearer token for the search endpoint.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from `GITHUB_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_value(std::env::var(CREDENTIAL_ENV).ok())
    }

    fn from_value(value: Option<String>) -> Result<Self, ConfigError> {
        match value {
            Some(token) if !token.trim().is_empty() => Ok(Self(token.trim().to_string())),
            _ => Err(ConfigError::MissingCredential),
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GITHUB_TOKEN env required.")]
    MissingCredential,
    #[error("unknown anchor timezone: {0}")]
    UnknownTimezone(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
