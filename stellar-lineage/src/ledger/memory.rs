//! In-memory [`StatusLedger`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use super::StatusLedger;
use crate::core::{LineageRecord, LineageStatus, RecordPatch};
use crate::errors::{LineageError, Result};
use crate::utils::{Clock, SystemClock};

#[derive(Debug, Default)]
struct LedgerState {
    /// Rows in insertion order; never removed.
    rows: Vec<LineageRecord>,
    by_id: HashMap<Uuid, usize>,
    by_status: HashMap<LineageStatus, BTreeSet<usize>>,
}

impl LedgerState {
    fn set_status(&mut self, pos: usize, status: LineageStatus) {
        let old = self.rows[pos].status;
        if let Some(set) = self.by_status.get_mut(&old) {
            set.remove(&pos);
        }
        self.by_status.entry(status).or_default().insert(pos);
        self.rows[pos].status = status;
    }
}

/// Ledger backed by a mutex-guarded vector with id and status indexes.
///
/// All operations take the lock once, so [`StatusLedger::claim`] is atomic
/// within the process.
#[derive(Debug, Clone)]
pub struct InMemoryStatusLedger {
    state: Arc<Mutex<LedgerState>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStatusLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStatusLedger {
    /// Creates an empty ledger on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty ledger that stamps writes with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            clock,
        }
    }

    /// Number of stored rows, including historical ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().rows.is_empty()
    }

    /// Copy of every row in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LineageRecord> {
        self.state.lock().rows.clone()
    }
}

#[async_trait]
impl StatusLedger for InMemoryStatusLedger {
    async fn find_one(&self, account: &str, network: &str) -> Result<Option<LineageRecord>> {
        let state = self.state.lock();
        Ok(state
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.account == account && r.network == network)
            .max_by_key(|(pos, r)| (r.created_at, *pos))
            .map(|(_, r)| r.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LineageRecord>> {
        let state = self.state.lock();
        Ok(state.by_id.get(&id).map(|&pos| state.rows[pos].clone()))
    }

    async fn find_all_by_status(&self, statuses: &[LineageStatus]) -> Result<Vec<LineageRecord>> {
        let state = self.state.lock();
        let mut positions: Vec<usize> = statuses
            .iter()
            .filter_map(|status| state.by_status.get(status))
            .flatten()
            .copied()
            .collect();
        positions.sort_by_key(|&pos| (state.rows[pos].created_at, pos));
        positions.dedup();
        Ok(positions.into_iter().map(|pos| state.rows[pos].clone()).collect())
    }

    async fn create(&self, record: LineageRecord) -> Result<LineageRecord> {
        let mut state = self.state.lock();
        if state.by_id.contains_key(&record.id) {
            return Err(LineageError::Ledger(format!(
                "record {} already exists",
                record.id
            )));
        }

        let pos = state.rows.len();
        state.by_id.insert(record.id, pos);
        state.by_status.entry(record.status).or_default().insert(pos);
        state.rows.push(record.clone());
        Ok(record)
    }

    async fn advance(
        &self,
        id: Uuid,
        patch: RecordPatch,
        status: LineageStatus,
    ) -> Result<LineageRecord> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let pos = *state
            .by_id
            .get(&id)
            .ok_or_else(|| LineageError::NotFound(format!("lineage record {id}")))?;

        patch.apply(&mut state.rows[pos]);
        state.set_status(pos, status);
        state.rows[pos].updated_at = now;
        Ok(state.rows[pos].clone())
    }

    async fn claim(
        &self,
        id: Uuid,
        expected: LineageStatus,
        in_progress: LineageStatus,
    ) -> Result<bool> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let pos = *state
            .by_id
            .get(&id)
            .ok_or_else(|| LineageError::NotFound(format!("lineage record {id}")))?;

        if state.rows[pos].status != expected {
            return Ok(false);
        }
        state.set_status(pos, in_progress);
        state.rows[pos].updated_at = now;
        Ok(true)
    }
}
