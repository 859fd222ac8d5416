//! Shared dependencies handed to every stage.
//!
//! A [`StageContext`] is built once per fleet and cloned into each driver.
//! It owns no mutable state of its own; everything it holds is behind an
//! `Arc` or is an immutable value.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{CrawlerConfig, NetworkConfig};
use crate::core::{RATE_LIMITED_BY_DOCUMENT_STORE, RATE_LIMITED_BY_EXTERNAL_API_SERVER};
use crate::documents::{DocumentStore, ResilientDocumentStore};
use crate::errors::{LineageError, Result};
use crate::events::{EventSink, NoOpEventSink};
use crate::health::{HealthMonitor, InMemoryCronHealthStore};
use crate::ledger::StatusLedger;
use crate::pipeline::RetryPolicy;
use crate::upstream::{DirectoryApi, HorizonApi};
use crate::utils::{Clock, SystemClock};

/// Dependencies shared by all stages of one fleet.
#[derive(Clone)]
pub struct StageContext {
    ledger: Arc<dyn StatusLedger>,
    documents: Arc<dyn DocumentStore>,
    horizon: Arc<dyn HorizonApi>,
    directory: Arc<dyn DirectoryApi>,
    health: HealthMonitor,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: CrawlerConfig,
    networks: HashMap<String, NetworkConfig>,
}

impl fmt::Debug for StageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageContext")
            .field("config", &self.config)
            .field("networks", &self.networks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl StageContext {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> StageContextBuilder {
        StageContextBuilder::default()
    }

    /// The lineage ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn StatusLedger> {
        &self.ledger
    }

    /// The Horizon client.
    #[must_use]
    pub fn horizon(&self) -> &Arc<dyn HorizonApi> {
        &self.horizon
    }

    /// The directory client.
    #[must_use]
    pub fn directory(&self) -> &Arc<dyn DirectoryApi> {
        &self.directory
    }

    /// The health monitor.
    #[must_use]
    pub const fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Crawler settings.
    #[must_use]
    pub const fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Resolves a record's network name.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks
            .get(name)
            .ok_or_else(|| LineageError::Config(format!("unknown network: {name}")))
    }

    /// Retry policy for upstream API calls made by `stage`.
    ///
    /// Exhaustion marks the fleet unhealthy with the stage as origin.
    #[must_use]
    pub fn upstream_policy(&self, stage: &str) -> RetryPolicy {
        RetryPolicy::new(self.config.upstream_retry.clone())
            .with_hook(self.health.retry_hook(stage, RATE_LIMITED_BY_EXTERNAL_API_SERVER))
    }

    /// The document store, wrapped in the retry policy for `stage`.
    #[must_use]
    pub fn documents_for(&self, stage: &str) -> ResilientDocumentStore {
        ResilientDocumentStore::new(
            self.documents.clone(),
            RetryPolicy::new(self.config.document_store_retry.clone())
                .with_hook(self.health.retry_hook(stage, RATE_LIMITED_BY_DOCUMENT_STORE)),
        )
    }

    /// Emits an event to the configured sink.
    pub async fn emit(&self, event_type: &str, data: Value) {
        self.events.emit(event_type, Some(data)).await;
    }
}

/// Builder for [`StageContext`].
#[derive(Default)]
pub struct StageContextBuilder {
    ledger: Option<Arc<dyn StatusLedger>>,
    documents: Option<Arc<dyn DocumentStore>>,
    horizon: Option<Arc<dyn HorizonApi>>,
    directory: Option<Arc<dyn DirectoryApi>>,
    health: Option<HealthMonitor>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<CrawlerConfig>,
    networks: Vec<NetworkConfig>,
}

impl StageContextBuilder {
    /// Sets the ledger.
    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn StatusLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the raw document store; retries are added per stage.
    #[must_use]
    pub fn documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Sets the Horizon client.
    #[must_use]
    pub fn horizon(mut self, horizon: Arc<dyn HorizonApi>) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the directory client.
    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn DirectoryApi>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Sets the health monitor. Defaults to an in-memory one.
    #[must_use]
    pub fn health(mut self, health: HealthMonitor) -> Self {
        self.health = Some(health);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the crawler settings.
    #[must_use]
    pub fn config(mut self, config: CrawlerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds or replaces a network. Public and testnet presets are always present.
    #[must_use]
    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.networks.push(network);
        self
    }

    /// Validates and builds the context.
    pub fn build(self) -> Result<StageContext> {
        fn required<T>(value: Option<T>, what: &str) -> Result<T> {
            value.ok_or_else(|| LineageError::Config(format!("stage context needs a {what}")))
        }

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let events = self.events.unwrap_or_else(|| Arc::new(NoOpEventSink));
        let health = self.health.unwrap_or_else(|| {
            HealthMonitor::new(Arc::new(InMemoryCronHealthStore::new()))
                .with_clock(clock.clone())
                .with_event_sink(events.clone())
        });

        let networks: HashMap<String, NetworkConfig> =
            [NetworkConfig::public(), NetworkConfig::testnet()]
                .into_iter()
                .chain(self.networks)
                .map(|n| (n.name.clone(), n))
                .collect();

        Ok(StageContext {
            ledger: required(self.ledger, "ledger")?,
            documents: required(self.documents, "document store")?,
            horizon: required(self.horizon, "horizon client")?,
            directory: required(self.directory, "directory client")?,
            health,
            events,
            clock,
            config,
            networks,
        })
    }
}
