//! Health queries and unhealthy marking.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::{CronHealthStore, FLEET_CRON, HEALTH_CHECK_CRON};
use crate::core::{CronHealthRecord, HealthStatus};
use crate::errors::{LineageError, Result};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::pipeline::RetryExhaustedHook;
use crate::utils::{Clock, SystemClock};

/// Reads and writes stage health.
#[derive(Clone)]
pub struct HealthMonitor {
    store: Arc<dyn CronHealthStore>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    /// Creates a monitor over `store` on the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn CronHealthStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The clock used to stamp observations.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Latest observation for a cron.
    pub async fn current(&self, cron_name: &str) -> Result<Option<CronHealthRecord>> {
        self.store.latest(cron_name).await
    }

    /// Returns false if the cron or the fleet sentinel is unhealthy.
    ///
    /// A cron seen for the first time gets an initial HEALTHY row, which also
    /// makes it a target of later fleet-wide marks.
    pub async fn is_healthy(&self, cron_name: &str) -> Result<bool> {
        let own = match self.store.latest(cron_name).await? {
            Some(row) => row.status,
            None => {
                self.write(cron_name, HealthStatus::Healthy, "first observation")
                    .await?;
                HealthStatus::Healthy
            }
        };
        if !own.is_healthy() {
            return Ok(false);
        }

        let fleet = self.store.latest(FLEET_CRON).await?;
        Ok(fleet.map_or(true, |row| row.status.is_healthy()))
    }

    /// Marks a single cron unhealthy.
    pub async fn mark_unhealthy(&self, cron_name: &str, tag: &str, reason: &str) -> Result<()> {
        self.write(cron_name, HealthStatus::unhealthy(tag), reason)
            .await?;
        self.events
            .emit(
                events::HEALTH_UNHEALTHY,
                Some(json!({"cron": cron_name, "tag": tag, "reason": reason})),
            )
            .await;
        Ok(())
    }

    /// Marks the origin, the fleet sentinel and every known cron unhealthy.
    ///
    /// The health-check cron is never marked, so recovery keeps running.
    pub async fn mark_fleet_unhealthy(&self, origin: &str, tag: &str, reason: &str) -> Result<()> {
        let mut targets: BTreeSet<String> = self
            .store
            .latest_per_cron()
            .await?
            .into_iter()
            .map(|row| row.cron_name)
            .collect();
        targets.insert(origin.to_string());
        targets.insert(FLEET_CRON.to_string());
        targets.remove(HEALTH_CHECK_CRON);

        tracing::warn!(origin, tag, crons = targets.len(), "Marking fleet unhealthy");
        for cron in &targets {
            self.write(cron, HealthStatus::unhealthy(tag), reason).await?;
        }

        self.events
            .emit(
                events::HEALTH_UNHEALTHY,
                Some(json!({
                    "cron": origin,
                    "tag": tag,
                    "reason": reason,
                    "fleet": targets,
                })),
            )
            .await;
        Ok(())
    }

    /// Resets one cron to healthy.
    pub async fn mark_healthy(&self, cron_name: &str, reason: &str) -> Result<()> {
        self.write(cron_name, HealthStatus::Healthy, reason).await?;
        self.events
            .emit(
                events::HEALTH_RECOVERED,
                Some(json!({"cron": cron_name, "reason": reason})),
            )
            .await;
        Ok(())
    }

    /// Latest observation per cron, ordered by name.
    pub async fn overview(&self) -> Result<Vec<CronHealthRecord>> {
        self.store.latest_per_cron().await
    }

    /// Builds a retry hook that marks the fleet unhealthy on exhaustion.
    #[must_use]
    pub fn retry_hook(&self, origin: &str, tag: &str) -> Arc<dyn RetryExhaustedHook> {
        Arc::new(HealthRetryHook {
            monitor: self.clone(),
            origin: origin.to_string(),
            tag: tag.to_string(),
        })
    }

    async fn write(&self, cron_name: &str, status: HealthStatus, reason: &str) -> Result<()> {
        tracing::debug!(cron = cron_name, status = %status, reason, "Recording cron health");
        self.store
            .insert(CronHealthRecord::new(
                cron_name,
                status,
                reason,
                self.clock.now(),
            ))
            .await
    }
}

/// Retry hook reporting exhaustion to a [`HealthMonitor`].
#[derive(Debug)]
pub struct HealthRetryHook {
    monitor: HealthMonitor,
    origin: String,
    tag: String,
}

#[async_trait]
impl RetryExhaustedHook for HealthRetryHook {
    async fn on_exhausted(&self, operation: &str, attempts: usize, error: &LineageError) {
        let reason = format!("{operation} failed after {attempts} attempts: {error}");
        if let Err(err) = self
            .monitor
            .mark_fleet_unhealthy(&self.origin, &self.tag, &reason)
            .await
        {
            // The caller still receives the original error.
            tracing::error!(origin = %self.origin, error = %err, "Could not record fleet health");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RATE_LIMITED_BY_DOCUMENT_STORE, RATE_LIMITED_BY_EXTERNAL_API_SERVER};
    use crate::events::CollectingEventSink;
    use crate::health::InMemoryCronHealthStore;

    fn monitor() -> (HealthMonitor, InMemoryCronHealthStore, Arc<CollectingEventSink>) {
        let store = InMemoryCronHealthStore::new();
        let sink = Arc::new(CollectingEventSink::new());
        let monitor = HealthMonitor::new(Arc::new(store.clone())).with_event_sink(sink.clone());
        (monitor, store, sink)
    }

    #[tokio::test]
    async fn test_first_observation_writes_healthy_row() {
        let (monitor, store, _) = monitor();

        assert!(monitor.is_healthy("collect_horizon_accounts").await.unwrap());
        let history = store.history("collect_horizon_accounts");
        assert_eq!(history.len(), 1);
        assert!(history[0].status.is_healthy());

        monitor.is_healthy("collect_horizon_accounts").await.unwrap();
        assert_eq!(store.history("collect_horizon_accounts").len(), 1);
    }

    #[tokio::test]
    async fn test_own_unhealthy_row_blocks() {
        let (monitor, _, sink) = monitor();
        monitor
            .mark_unhealthy("collect_horizon_effects", RATE_LIMITED_BY_DOCUMENT_STORE, "429")
            .await
            .unwrap();

        assert!(!monitor.is_healthy("collect_horizon_effects").await.unwrap());
        assert!(monitor.is_healthy("collect_creator_account").await.unwrap());
        assert_eq!(sink.events_of_type("health.unhealthy").len(), 1);
    }

    #[tokio::test]
    async fn test_fleet_mark_blocks_every_cron_but_health_check() {
        let (monitor, store, _) = monitor();
        monitor.is_healthy("collect_horizon_accounts").await.unwrap();
        monitor.is_healthy("collect_creator_account").await.unwrap();
        monitor.is_healthy(HEALTH_CHECK_CRON).await.unwrap();

        monitor
            .mark_fleet_unhealthy(
                "collect_horizon_accounts",
                RATE_LIMITED_BY_EXTERNAL_API_SERVER,
                "retries exhausted",
            )
            .await
            .unwrap();

        for cron in ["collect_horizon_accounts", "collect_creator_account", FLEET_CRON] {
            let latest = store.latest(cron).await.unwrap().unwrap();
            assert_eq!(
                latest.status.to_string(),
                "UNHEALTHY_RATE_LIMITED_BY_EXTERNAL_API_SERVER"
            );
        }
        assert!(store
            .latest(HEALTH_CHECK_CRON)
            .await
            .unwrap()
            .unwrap()
            .status
            .is_healthy());

        // A cron first seen after the mark is still blocked by the fleet row.
        assert!(!monitor.is_healthy("collect_directory").await.unwrap());
    }

    #[tokio::test]
    async fn test_retry_hook_marks_fleet() {
        let (monitor, store, _) = monitor();
        let hook = monitor.retry_hook("collect_horizon_operations", RATE_LIMITED_BY_EXTERNAL_API_SERVER);

        hook.on_exhausted(
            "horizon.operations",
            7,
            &LineageError::NotFound("x".to_string()),
        )
        .await;

        let row = store.latest(FLEET_CRON).await.unwrap().unwrap();
        assert!(!row.status.is_healthy());
        assert!(row.reason.contains("horizon.operations failed after 7 attempts"));
    }

    #[tokio::test]
    async fn test_mark_healthy_and_overview() {
        let (monitor, _, sink) = monitor();
        monitor.mark_unhealthy("a", "X", "").await.unwrap();
        monitor.mark_healthy("a", "recovered").await.unwrap();
        monitor.mark_unhealthy("b", "Y", "").await.unwrap();

        let overview = monitor.overview().await.unwrap();
        let summary: Vec<_> = overview
            .iter()
            .map(|r| (r.cron_name.as_str(), r.status.to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![("a", "HEALTHY".to_string()), ("b", "UNHEALTHY_Y".to_string())]
        );
        assert_eq!(sink.events_of_type("health.recovered").len(), 1);
    }
}
