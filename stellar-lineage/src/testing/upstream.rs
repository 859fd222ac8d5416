//! In-memory upstream doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::fixtures;
use crate::config::NetworkConfig;
use crate::errors::{Result, UpstreamError};
use crate::upstream::{DirectoryApi, HorizonApi};

/// Horizon double serving canned responses per account.
///
/// Unknown accounts answer HTTP 404. [`StaticHorizonApi::fail_with_status`]
/// makes every call answer the given status instead.
#[derive(Debug, Default)]
pub struct StaticHorizonApi {
    accounts: Mutex<HashMap<String, Value>>,
    operations: Mutex<HashMap<String, Value>>,
    effects: Mutex<HashMap<String, Value>>,
    failure: Mutex<Option<u16>>,
    calls: AtomicUsize,
}

impl StaticHorizonApi {
    /// Creates an empty double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `value` for `GET /accounts/{account}`.
    pub fn insert_account(&self, account: &str, value: Value) {
        self.accounts.lock().insert(account.to_string(), value);
    }

    /// Serves `value` for `GET /accounts/{account}/operations`.
    pub fn insert_operations(&self, account: &str, value: Value) {
        self.operations.lock().insert(account.to_string(), value);
    }

    /// Serves `value` for `GET /accounts/{account}/effects`.
    pub fn insert_effects(&self, account: &str, value: Value) {
        self.effects.lock().insert(account.to_string(), value);
    }

    /// Loads all three datasets for an account funded by `creator`.
    ///
    /// With no creator the operations page holds only a payment.
    pub fn seed_account(&self, account: &str, creator: Option<&str>, home_domain: Option<&str>) {
        self.insert_account(account, fixtures::account_json(account, home_domain, "100.0000000"));
        let ops = match creator {
            Some(funder) => vec![fixtures::create_account_op(
                funder,
                account,
                "2021-03-04T05:06:07Z",
            )],
            None => vec![fixtures::payment_op(account, account, "1.0")],
        };
        self.insert_operations(account, fixtures::operations_json(ops));
        self.insert_effects(account, fixtures::effects_json(account));
    }

    /// Makes every call fail with `status`.
    pub fn fail_with_status(&self, status: u16) {
        *self.failure.lock() = Some(status);
    }

    /// Restores normal responses.
    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Number of calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(
        &self,
        table: &Mutex<HashMap<String, Value>>,
        url: String,
        account: &str,
    ) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = *self.failure.lock();
        if let Some(status) = status {
            return Err(status_error("horizon", url, status));
        }
        table
            .lock()
            .get(account)
            .cloned()
            .ok_or_else(|| status_error("horizon", url, 404))
    }
}

fn status_error(api: &str, url: String, status: u16) -> crate::errors::LineageError {
    UpstreamError::Status {
        api: api.to_string(),
        url,
        status,
    }
    .into()
}

#[async_trait]
impl HorizonApi for StaticHorizonApi {
    async fn account(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.respond(&self.accounts, network.account_url(account), account)
    }

    async fn operations(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.respond(&self.operations, network.operations_url(account), account)
    }

    async fn effects(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.respond(&self.effects, network.effects_url(account), account)
    }
}

/// Directory double. Anything not configured answers `null`, like a 404
/// from the real directory.
#[derive(Debug, Default)]
pub struct StaticDirectoryApi {
    responses: Mutex<HashMap<String, Value>>,
    failure: Mutex<Option<u16>>,
    calls: AtomicUsize,
}

impl StaticDirectoryApi {
    /// Creates an empty double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `value` for the asset list of `account`.
    pub fn insert_asset_list(&self, account: &str, value: Value) {
        self.insert(format!("asset_list:{account}"), value);
    }

    /// Serves `value` for the rating of `code`-`issuer`.
    pub fn insert_asset_rating(&self, code: &str, issuer: &str, value: Value) {
        self.insert(format!("asset_rating:{code}-{issuer}"), value);
    }

    /// Serves `value` for the blocklist lookup of `domain`.
    pub fn insert_blocked_domain(&self, domain: &str, value: Value) {
        self.insert(format!("blocked_domain:{domain}"), value);
    }

    /// Serves `value` for the directory entry of `account`.
    pub fn insert_account_directory(&self, account: &str, value: Value) {
        self.insert(format!("account_directory:{account}"), value);
    }

    /// Makes every call fail with `status`.
    pub fn fail_with_status(&self, status: u16) {
        *self.failure.lock() = Some(status);
    }

    /// Number of calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&self, key: String, value: Value) {
        self.responses.lock().insert(key, value);
    }

    fn respond(&self, key: String, url: String) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = *self.failure.lock();
        if let Some(status) = status {
            return Err(status_error("stellar_expert", url, status));
        }
        Ok(self.responses.lock().get(&key).cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl DirectoryApi for StaticDirectoryApi {
    async fn asset_list(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.respond(
            format!("asset_list:{account}"),
            network.asset_list_url(account),
        )
    }

    async fn asset_rating(
        &self,
        network: &NetworkConfig,
        code: &str,
        issuer: &str,
        asset_type: &str,
    ) -> Result<Value> {
        self.respond(
            format!("asset_rating:{code}-{issuer}"),
            network.asset_rating_url(code, issuer, asset_type),
        )
    }

    async fn blocked_domain(&self, network: &NetworkConfig, domain: &str) -> Result<Value> {
        self.respond(
            format!("blocked_domain:{domain}"),
            network.blocked_domain_url(domain),
        )
    }

    async fn account_directory(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.respond(
            format!("account_directory:{account}"),
            network.account_directory_url(account),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LineageError;

    #[tokio::test]
    async fn test_unknown_account_is_404() {
        let horizon = StaticHorizonApi::new();
        let err = horizon
            .account(&NetworkConfig::public(), "GMISSING")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LineageError::Upstream(UpstreamError::Status { status: 404, .. })
        ));
        assert!(!err.is_transient());
        assert_eq!(horizon.calls(), 1);
    }

    #[tokio::test]
    async fn test_forced_failure_overrides_fixtures() {
        let horizon = StaticHorizonApi::new();
        horizon.seed_account("GA", None, None);
        horizon.fail_with_status(429);
        let err = horizon
            .operations(&NetworkConfig::public(), "GA")
            .await
            .unwrap_err();
        assert!(err.is_transient());

        horizon.clear_failure();
        assert!(horizon
            .operations(&NetworkConfig::public(), "GA")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_directory_defaults_to_null() {
        let directory = StaticDirectoryApi::new();
        directory.insert_blocked_domain("bad.example", serde_json::json!({"blocked": true}));
        let network = NetworkConfig::public();

        assert_eq!(
            directory.asset_list(&network, "GA").await.unwrap(),
            Value::Null
        );
        assert_eq!(
            directory.blocked_domain(&network, "bad.example").await.unwrap()["blocked"],
            true
        );
        assert_eq!(directory.calls(), 2);
    }
}
