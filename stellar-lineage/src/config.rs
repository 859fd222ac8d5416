//! Configuration types for the crawler.
//!
//! [`NetworkConfig`] is an immutable value handed to every component that
//! builds an upstream URL. [`CrawlerConfig`] carries retry, health and
//! transport settings; every field has a serde default so partial JSON files
//! load cleanly.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{LineageError, Result};
use crate::pipeline::RetryConfig;

/// Base URLs for one Stellar network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name as stored on lineage records ("public" or "testnet").
    pub name: String,
    /// Horizon base URL, without trailing slash.
    pub horizon_url: String,
    /// Stellar Expert API base, without trailing slash.
    #[serde(default = "default_expert_api_url")]
    pub expert_api_url: String,
    /// Stellar Expert site base used for explorer links.
    #[serde(default = "default_expert_site_url")]
    pub expert_site_url: String,
}

fn default_expert_api_url() -> String {
    "https://api.stellar.expert".to_string()
}

fn default_expert_site_url() -> String {
    "https://stellar.expert".to_string()
}

impl NetworkConfig {
    /// The public Stellar network.
    #[must_use]
    pub fn public() -> Self {
        Self {
            name: "public".to_string(),
            horizon_url: "https://horizon.stellar.org".to_string(),
            expert_api_url: default_expert_api_url(),
            expert_site_url: default_expert_site_url(),
        }
    }

    /// The Stellar test network.
    #[must_use]
    pub fn testnet() -> Self {
        Self {
            name: "testnet".to_string(),
            horizon_url: "https://horizon-testnet.stellar.org".to_string(),
            expert_api_url: default_expert_api_url(),
            expert_site_url: default_expert_site_url(),
        }
    }

    /// Looks up a preset by network name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "public" => Ok(Self::public()),
            "testnet" => Ok(Self::testnet()),
            other => Err(LineageError::Config(format!("unknown network: {other}"))),
        }
    }

    /// Overrides the Horizon base URL.
    #[must_use]
    pub fn with_horizon_url(mut self, url: impl Into<String>) -> Self {
        self.horizon_url = url.into();
        self
    }

    /// Overrides the Stellar Expert API base.
    #[must_use]
    pub fn with_expert_api_url(mut self, url: impl Into<String>) -> Self {
        self.expert_api_url = url.into();
        self
    }

    /// `GET /accounts/{account}`
    #[must_use]
    pub fn account_url(&self, account: &str) -> String {
        format!("{}/accounts/{account}", self.horizon_url)
    }

    /// `GET /accounts/{account}/operations`
    #[must_use]
    pub fn operations_url(&self, account: &str) -> String {
        format!("{}/accounts/{account}/operations", self.horizon_url)
    }

    /// `GET /accounts/{account}/effects`
    #[must_use]
    pub fn effects_url(&self, account: &str) -> String {
        format!("{}/accounts/{account}/effects", self.horizon_url)
    }

    /// Human-facing explorer page for an account.
    #[must_use]
    pub fn explorer_account_link(&self, account: &str) -> String {
        format!(
            "{}/explorer/{}/account/{account}",
            self.expert_site_url, self.name
        )
    }

    /// Assets whose issuer or code matches the account.
    #[must_use]
    pub fn asset_list_url(&self, account: &str) -> String {
        format!(
            "{}/explorer/{}/asset?search={account}",
            self.expert_api_url, self.name
        )
    }

    /// Rating of one asset.
    #[must_use]
    pub fn asset_rating_url(&self, code: &str, issuer: &str, asset_type: &str) -> String {
        format!(
            "{}/explorer/{}/asset/{code}-{issuer}-{asset_type}/rating",
            self.expert_api_url, self.name
        )
    }

    /// Blocklist entry for a home domain. Not network scoped.
    #[must_use]
    pub fn blocked_domain_url(&self, domain: &str) -> String {
        format!(
            "{}/explorer/directory/blocked-domains/{domain}",
            self.expert_api_url
        )
    }

    /// Directory entry for an account.
    #[must_use]
    pub fn account_directory_url(&self, account: &str) -> String {
        format!(
            "{}/explorer/{}/directory/{account}",
            self.expert_api_url, self.name
        )
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::public()
    }
}

/// Where raw upstream documents are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// Document API base URL; collection paths are appended to it.
    #[serde(default)]
    pub base_url: String,
    /// Application token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    /// Header carrying the token.
    #[serde(default = "default_token_header")]
    pub token_header: String,
}

fn default_token_header() -> String {
    "X-Cassandra-Token".to_string()
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            token_header: default_token_header(),
        }
    }
}

/// Settings shared by every stage of the crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Retry behavior for Horizon and Stellar Expert calls.
    #[serde(default = "default_upstream_retry")]
    pub upstream_retry: RetryConfig,
    /// Retry behavior for document store writes.
    #[serde(default = "default_document_store_retry")]
    pub document_store_retry: RetryConfig,
    /// How long a stage stays unhealthy before the health check resets it.
    #[serde(default = "default_recovery_buffer_secs")]
    pub recovery_buffer_secs: u64,
    /// Minimum age of a creator record before it is re-armed for crawling.
    #[serde(default = "default_grandparent_refresh_secs")]
    pub grandparent_refresh_secs: u64,
    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Fleet tick interval.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Document store endpoint.
    #[serde(default)]
    pub document_store: DocumentStoreConfig,
}

fn default_upstream_retry() -> RetryConfig {
    RetryConfig::upstream_api()
}

fn default_document_store_retry() -> RetryConfig {
    RetryConfig::document_store()
}

fn default_recovery_buffer_secs() -> u64 {
    6_120 // 1.7 hours
}

fn default_grandparent_refresh_secs() -> u64 {
    3 * 60 * 60
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_tick_interval_secs() -> u64 {
    60
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            upstream_retry: default_upstream_retry(),
            document_store_retry: default_document_store_retry(),
            recovery_buffer_secs: default_recovery_buffer_secs(),
            grandparent_refresh_secs: default_grandparent_refresh_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            document_store: DocumentStoreConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the upstream retry configuration.
    #[must_use]
    pub fn with_upstream_retry(mut self, retry: RetryConfig) -> Self {
        self.upstream_retry = retry;
        self
    }

    /// Sets the document store retry configuration.
    #[must_use]
    pub fn with_document_store_retry(mut self, retry: RetryConfig) -> Self {
        self.document_store_retry = retry;
        self
    }

    /// Sets the recovery buffer.
    #[must_use]
    pub const fn with_recovery_buffer_secs(mut self, secs: u64) -> Self {
        self.recovery_buffer_secs = secs;
        self
    }

    /// Sets the grandparent refresh age.
    #[must_use]
    pub const fn with_grandparent_refresh_secs(mut self, secs: u64) -> Self {
        self.grandparent_refresh_secs = secs;
        self
    }

    /// Checks every nested value.
    pub fn validate(&self) -> Result<()> {
        self.upstream_retry.validate()?;
        self.document_store_retry.validate()?;
        if self.http_timeout_secs == 0 {
            return Err(LineageError::Config(
                "http_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(LineageError::Config(
                "tick_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Recovery buffer as a chrono duration.
    #[must_use]
    pub fn recovery_buffer(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.recovery_buffer_secs).unwrap_or(i64::MAX))
    }

    /// Grandparent refresh age as a chrono duration.
    #[must_use]
    pub fn grandparent_refresh(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            i64::try_from(self.grandparent_refresh_secs).unwrap_or(i64::MAX),
        )
    }

    /// HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Fleet tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_network_presets() {
        let public = NetworkConfig::public();
        assert_eq!(public.name, "public");
        assert_eq!(
            public.account_url("GA"),
            "https://horizon.stellar.org/accounts/GA"
        );

        let testnet = NetworkConfig::from_name("testnet").unwrap();
        assert_eq!(
            testnet.effects_url("GA"),
            "https://horizon-testnet.stellar.org/accounts/GA/effects"
        );
        assert!(NetworkConfig::from_name("futurenet").is_err());
    }

    #[test]
    fn test_expert_urls() {
        let net = NetworkConfig::public();
        assert_eq!(
            net.explorer_account_link("GA"),
            "https://stellar.expert/explorer/public/account/GA"
        );
        assert_eq!(
            net.asset_rating_url("USD", "GI", "credit_alphanum4"),
            "https://api.stellar.expert/explorer/public/asset/USD-GI-credit_alphanum4/rating"
        );
        assert_eq!(
            net.blocked_domain_url("example.org"),
            "https://api.stellar.expert/explorer/directory/blocked-domains/example.org"
        );
        assert_eq!(
            net.asset_list_url("GA"),
            "https://api.stellar.expert/explorer/public/asset?search=GA"
        );
    }

    #[test]
    fn test_crawler_defaults() {
        let config = CrawlerConfig::default();
        assert_eq!(config.upstream_retry.max_attempts, 7);
        assert_eq!(config.upstream_retry.max_delay_ms, 71_000);
        assert_eq!(config.document_store_retry.max_delay_ms, 7_000);
        assert_eq!(config.recovery_buffer(), chrono::Duration::minutes(102));
        assert_eq!(config.grandparent_refresh(), chrono::Duration::hours(3));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CrawlerConfig::from_json_str(r#"{"recovery_buffer_secs": 60}"#).unwrap();
        assert_eq!(config.recovery_buffer_secs, 60);
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.document_store.token_header, "X-Cassandra-Token");
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = CrawlerConfig::from_json_str(
            r#"{"upstream_retry": {"max_attempts": 0, "base_delay_ms": 1, "max_delay_ms": 2}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LineageError::Config(_)));

        assert!(CrawlerConfig::from_json_str(r#"{"http_timeout_secs": 0}"#).is_err());
        assert!(CrawlerConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"grandparent_refresh_secs": 10, "document_store": {{"base_url": "https://docs.example/api", "token": "t"}}}}"#
        )
        .unwrap();

        let config = CrawlerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.grandparent_refresh_secs, 10);
        assert_eq!(config.document_store.base_url, "https://docs.example/api");
        assert_eq!(config.document_store.token.as_deref(), Some("t"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CrawlerConfig::from_json_file("/nonexistent/crawler.json").unwrap_err();
        assert!(matches!(err, LineageError::Io(_)));
    }
}
