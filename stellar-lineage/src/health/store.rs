//! Append-only storage of health observations.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::CronHealthRecord;
use crate::errors::Result;

/// Repository of [`CronHealthRecord`] rows.
#[async_trait]
pub trait CronHealthStore: Send + Sync {
    /// Appends one observation.
    async fn insert(&self, row: CronHealthRecord) -> Result<()>;

    /// Most recent observation for a cron.
    async fn latest(&self, cron_name: &str) -> Result<Option<CronHealthRecord>>;

    /// Most recent observation per cron, ordered by cron name.
    async fn latest_per_cron(&self) -> Result<Vec<CronHealthRecord>>;
}

/// Health rows kept in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCronHealthStore {
    rows: Arc<Mutex<Vec<CronHealthRecord>>>,
}

impl InMemoryCronHealthStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row for one cron, oldest first.
    #[must_use]
    pub fn history(&self, cron_name: &str) -> Vec<CronHealthRecord> {
        self.rows
            .lock()
            .iter()
            .filter(|r| r.cron_name == cron_name)
            .cloned()
            .collect()
    }

    /// Total number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Returns true if no row was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl CronHealthStore for InMemoryCronHealthStore {
    async fn insert(&self, row: CronHealthRecord) -> Result<()> {
        self.rows.lock().push(row);
        Ok(())
    }

    async fn latest(&self, cron_name: &str) -> Result<Option<CronHealthRecord>> {
        // Later rows win ties on created_at.
        Ok(self
            .rows
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.cron_name == cron_name)
            .max_by_key(|(pos, r)| (r.created_at, *pos))
            .map(|(_, r)| r.clone()))
    }

    async fn latest_per_cron(&self) -> Result<Vec<CronHealthRecord>> {
        let rows = self.rows.lock();
        let mut latest: BTreeMap<&str, (usize, &CronHealthRecord)> = BTreeMap::new();
        for (pos, row) in rows.iter().enumerate() {
            let newer = latest
                .get(row.cron_name.as_str())
                .map_or(true, |(p, r)| (row.created_at, pos) > (r.created_at, *p));
            if newer {
                latest.insert(&row.cron_name, (pos, row));
            }
        }
        Ok(latest.into_values().map(|(_, r)| r.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HealthStatus;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_latest_per_cron() {
        let store = InMemoryCronHealthStore::new();
        let t0 = Utc::now();

        store
            .insert(CronHealthRecord::new("b", HealthStatus::Healthy, "", t0))
            .await
            .unwrap();
        store
            .insert(CronHealthRecord::new(
                "a",
                HealthStatus::unhealthy("X"),
                "",
                t0,
            ))
            .await
            .unwrap();
        store
            .insert(CronHealthRecord::new(
                "a",
                HealthStatus::Healthy,
                "",
                t0 + Duration::seconds(1),
            ))
            .await
            .unwrap();

        let latest = store.latest_per_cron().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].cron_name, "a");
        assert!(latest[0].status.is_healthy());
        assert_eq!(store.history("a").len(), 2);
        assert!(store.latest("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_timestamp_last_insert_wins() {
        let store = InMemoryCronHealthStore::new();
        let t0 = Utc::now();
        store
            .insert(CronHealthRecord::new("a", HealthStatus::Healthy, "", t0))
            .await
            .unwrap();
        store
            .insert(CronHealthRecord::new(
                "a",
                HealthStatus::unhealthy("X"),
                "",
                t0,
            ))
            .await
            .unwrap();

        let latest = store.latest("a").await.unwrap().unwrap();
        assert!(!latest.status.is_healthy());
    }
}
