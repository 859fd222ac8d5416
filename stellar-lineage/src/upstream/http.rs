//! `reqwest` clients for the upstream APIs.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::{DirectoryApi, HorizonApi};
use crate::config::NetworkConfig;
use crate::errors::{LineageError, Result, UpstreamError};

const USER_AGENT: &str = concat!("stellar-lineage/", env!("CARGO_PKG_VERSION"));

/// Sends a request and decodes a JSON body, classifying failures.
pub(crate) async fn send_json(request: RequestBuilder, api: &str, url: &str) -> Result<Value> {
    let response = request.send().await.map_err(|e| UpstreamError::Transport {
        api: api.to_string(),
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            api: api.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }

    response.json::<Value>().await.map_err(|e| {
        UpstreamError::Decode {
            api: api.to_string(),
            url: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LineageError::Config(format!("http client: {e}")))
}

/// Horizon over HTTP.
#[derive(Debug, Clone)]
pub struct HorizonClient {
    http: Client,
}

impl HorizonClient {
    /// Creates a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
        })
    }

    async fn get(&self, url: String) -> Result<Value> {
        tracing::debug!(%url, "GET horizon");
        send_json(self.http.get(&url), "horizon", &url).await
    }
}

#[async_trait]
impl HorizonApi for HorizonClient {
    async fn account(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.get(network.account_url(account)).await
    }

    async fn operations(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.get(network.operations_url(account)).await
    }

    async fn effects(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.get(network.effects_url(account)).await
    }
}

/// Stellar Expert over HTTP.
#[derive(Debug, Clone)]
pub struct StellarExpertClient {
    http: Client,
}

impl StellarExpertClient {
    /// Creates a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
        })
    }

    /// 404 means "no entry", which is a normal answer for most accounts.
    async fn get(&self, url: String) -> Result<Value> {
        tracing::debug!(%url, "GET stellar expert");
        match send_json(self.http.get(&url), "stellar_expert", &url).await {
            Err(LineageError::Upstream(UpstreamError::Status { status, .. }))
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Ok(Value::Null)
            }
            other => other,
        }
    }
}

#[async_trait]
impl DirectoryApi for StellarExpertClient {
    async fn asset_list(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.get(network.asset_list_url(account)).await
    }

    async fn asset_rating(
        &self,
        network: &NetworkConfig,
        code: &str,
        issuer: &str,
        asset_type: &str,
    ) -> Result<Value> {
        self.get(network.asset_rating_url(code, issuer, asset_type))
            .await
    }

    async fn blocked_domain(&self, network: &NetworkConfig, domain: &str) -> Result<Value> {
        self.get(network.blocked_domain_url(domain)).await
    }

    async fn account_directory(&self, network: &NetworkConfig, account: &str) -> Result<Value> {
        self.get(network.account_directory_url(account)).await
    }
}
