//! Durable per-account lineage records.
//!
//! [`StatusLedger`] is the only way stages read and write lineage state. The
//! access patterns are lookup by (account, network), lookup by id, and
//! status-range scans, so implementations should index by status.

mod memory;

pub use memory::InMemoryStatusLedger;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::{LineageRecord, LineageStatus, RecordPatch};
use crate::errors::Result;

/// Repository of lineage records.
#[async_trait]
pub trait StatusLedger: Send + Sync {
    /// Returns the current (most recently created) record for an account.
    async fn find_one(&self, account: &str, network: &str) -> Result<Option<LineageRecord>>;

    /// Returns a record by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LineageRecord>>;

    /// Returns every record whose status is in `statuses`, oldest first.
    async fn find_all_by_status(&self, statuses: &[LineageStatus]) -> Result<Vec<LineageRecord>>;

    /// Returns the oldest record whose status is in `statuses`.
    async fn find_first_by_status(
        &self,
        statuses: &[LineageStatus],
    ) -> Result<Option<LineageRecord>> {
        Ok(self.find_all_by_status(statuses).await?.into_iter().next())
    }

    /// Stores a new record.
    async fn create(&self, record: LineageRecord) -> Result<LineageRecord>;

    /// Merges `patch`, sets `status` and bumps `updated_at`.
    ///
    /// A missing id is [`crate::errors::LineageError::NotFound`].
    async fn advance(
        &self,
        id: Uuid,
        patch: RecordPatch,
        status: LineageStatus,
    ) -> Result<LineageRecord>;

    /// Moves a record from `expected` to `in_progress` if it is still at
    /// `expected`. Returns false if another writer got there first.
    async fn claim(
        &self,
        id: Uuid,
        expected: LineageStatus,
        in_progress: LineageStatus,
    ) -> Result<bool>;
}
