//! Fully in-memory stage context for tests.

use serde_json::Value;
use std::sync::Arc;

use crate::config::CrawlerConfig;
use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus};
use crate::documents::{DocumentMetadata, DocumentStore, InMemoryDocumentStore};
use crate::errors::{LineageError, Result};
use crate::events::CollectingEventSink;
use crate::health::{HealthMonitor, InMemoryCronHealthStore};
use crate::ledger::{InMemoryStatusLedger, StatusLedger};
use crate::pipeline::{JitterStrategy, RetryConfig};
use crate::utils::{Clock, ManualClock};

use super::{StaticDirectoryApi, StaticHorizonApi};

/// Seven attempts, no delay, no jitter.
#[must_use]
pub fn fast_retry_config() -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(7)
        .with_base_delay_ms(0)
        .with_max_delay_ms(0)
        .with_jitter(JitterStrategy::None)
}

/// A [`StageContext`] over in-memory stores, with handles to each part.
///
/// Records added through the harness live on the `public` network.
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// The wired context.
    pub ctx: StageContext,
    /// Status ledger.
    pub ledger: InMemoryStatusLedger,
    /// Document store.
    pub documents: InMemoryDocumentStore,
    /// Health history.
    pub health_store: InMemoryCronHealthStore,
    /// Horizon double.
    pub horizon: Arc<StaticHorizonApi>,
    /// Directory double.
    pub directory: Arc<StaticDirectoryApi>,
    /// Every emitted event.
    pub events: Arc<CollectingEventSink>,
    /// The frozen clock shared by every component.
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Network used by [`TestHarness::add_pending`] and [`TestHarness::record`].
    pub const NETWORK: &'static str = "public";

    /// Creates a harness with fast retries.
    #[must_use]
    pub fn new() -> Self {
        let config = CrawlerConfig::default()
            .with_upstream_retry(fast_retry_config())
            .with_document_store_retry(fast_retry_config());
        Self::with_config(config)
    }

    /// Creates a harness with the given settings.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_config(config: CrawlerConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let ledger = InMemoryStatusLedger::with_clock(clock.clone());
        let documents = InMemoryDocumentStore::new();
        let health_store = InMemoryCronHealthStore::new();
        let horizon = Arc::new(StaticHorizonApi::new());
        let directory = Arc::new(StaticDirectoryApi::new());
        let events = Arc::new(CollectingEventSink::new());

        let health = HealthMonitor::new(Arc::new(health_store.clone()))
            .with_clock(clock.clone())
            .with_event_sink(events.clone());

        let ctx = StageContext::builder()
            .ledger(Arc::new(ledger.clone()))
            .documents(Arc::new(documents.clone()))
            .horizon(horizon.clone())
            .directory(directory.clone())
            .health(health)
            .events(events.clone())
            .clock(clock.clone())
            .config(config)
            .build()
            .expect("test harness config must validate");

        Self {
            ctx,
            ledger,
            documents,
            health_store,
            horizon,
            directory,
            events,
            clock,
        }
    }

    /// Inserts a fresh record at the pending status.
    pub async fn add_pending(&self, account: &str) -> Result<LineageRecord> {
        self.add_record(account, LineageStatus::PendingHorizonApiDatasets)
            .await
    }

    /// Inserts a fresh record at `status`.
    pub async fn add_record(&self, account: &str, status: LineageStatus) -> Result<LineageRecord> {
        self.ledger
            .create(LineageRecord::new(
                account,
                Self::NETWORK,
                status,
                self.clock.now(),
            ))
            .await
    }

    /// Stores `payload` directly in the document store and returns its href.
    pub async fn store_document(
        &self,
        collection: &str,
        account: &str,
        payload: &Value,
    ) -> Result<String> {
        let metadata = DocumentMetadata::new(account, Self::NETWORK, "fixture://");
        let stored = self
            .documents
            .put(collection, None, &metadata, payload)
            .await?;
        Ok(stored.href)
    }

    /// Reads the current record for `account`.
    pub async fn record(&self, account: &str) -> Result<LineageRecord> {
        self.ledger
            .find_one(account, Self::NETWORK)
            .await?
            .ok_or_else(|| LineageError::NotFound(format!("{account} on {}", Self::NETWORK)))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
