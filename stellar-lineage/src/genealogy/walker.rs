//! Creator-chain traversal.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::LineageRecord;
use crate::errors::{CycleDetectedError, Result};
use crate::ledger::StatusLedger;

/// Walks creator links from a target account towards its oldest ancestor.
///
/// The returned chain is leaf first: the target account, then its creator,
/// and so on. The walk stops at an account with no ledger record or with the
/// creator sentinel. An account seen twice fails with
/// [`CycleDetectedError`], whose path ends with the repeated account.
#[derive(Clone)]
pub struct AncestorChainWalker {
    ledger: Arc<dyn StatusLedger>,
}

impl std::fmt::Debug for AncestorChainWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AncestorChainWalker").finish_non_exhaustive()
    }
}

impl AncestorChainWalker {
    /// Creates a walker over `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn StatusLedger>) -> Self {
        Self { ledger }
    }

    /// Returns the chain for `account`, empty if it has no record.
    pub async fn walk(&self, account: &str, network: &str) -> Result<Vec<LineageRecord>> {
        let mut chain = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut path: Vec<String> = Vec::new();
        let mut current = account.to_string();

        loop {
            path.push(current.clone());
            if !visited.insert(current.clone()) {
                tracing::warn!(account, network, path = ?path, "Creator chain loops");
                return Err(CycleDetectedError::new(path, network).into());
            }

            let Some(record) = self.ledger.find_one(&current, network).await? else {
                break;
            };
            let next = record.creator().map(str::to_string);
            chain.push(record);

            match next {
                Some(creator) => current = creator,
                None => break,
            }
        }

        tracing::debug!(account, network, depth = chain.len(), "Walked creator chain");
        Ok(chain)
    }
}
