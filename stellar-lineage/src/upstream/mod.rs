//! External read APIs: Horizon and the Stellar Expert directory.
//!
//! Both are traits so stages can run against fakes. The `http` feature adds
//! `reqwest` clients. Responses stay as `serde_json::Value`; the pure
//! functions in [`parse`] pull out the handful of fields stages need.

#[cfg(feature = "http")]
mod http;
pub mod parse;

#[cfg(feature = "http")]
pub(crate) use http::send_json;
#[cfg(feature = "http")]
pub use http::{HorizonClient, StellarExpertClient};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::NetworkConfig;
use crate::errors::Result;

/// The Horizon ledger API. Only the first page of each listing is read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HorizonApi: Send + Sync {
    /// `GET /accounts/{account}`
    async fn account(&self, network: &NetworkConfig, account: &str) -> Result<Value>;

    /// `GET /accounts/{account}/operations`
    async fn operations(&self, network: &NetworkConfig, account: &str) -> Result<Value>;

    /// `GET /accounts/{account}/effects`
    async fn effects(&self, network: &NetworkConfig, account: &str) -> Result<Value>;
}

/// The Stellar Expert directory and rating API.
///
/// Lookups that find nothing return `Value::Null` rather than an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Assets matching the account.
    async fn asset_list(&self, network: &NetworkConfig, account: &str) -> Result<Value>;

    /// Rating of one asset.
    async fn asset_rating(
        &self,
        network: &NetworkConfig,
        code: &str,
        issuer: &str,
        asset_type: &str,
    ) -> Result<Value>;

    /// Blocklist entry for a home domain.
    async fn blocked_domain(&self, network: &NetworkConfig, domain: &str) -> Result<Value>;

    /// Directory entry for the account.
    async fn account_directory(&self, network: &NetworkConfig, account: &str) -> Result<Value>;
}
