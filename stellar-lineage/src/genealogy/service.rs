//! Read queries over lineage data.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AncestorChainWalker, TreeAssembler, TreeNode};
use crate::config::NetworkConfig;
use crate::core::LineageRecord;
use crate::errors::{LineageError, Result};
use crate::ledger::StatusLedger;

/// The query surface behind the search and tree views.
#[derive(Clone)]
pub struct GenealogyService {
    ledger: Arc<dyn StatusLedger>,
    walker: AncestorChainWalker,
    networks: HashMap<String, NetworkConfig>,
}

impl std::fmt::Debug for GenealogyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenealogyService")
            .field("networks", &self.networks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl GenealogyService {
    /// Creates a service knowing the public and testnet presets.
    #[must_use]
    pub fn new(ledger: Arc<dyn StatusLedger>) -> Self {
        let networks = [NetworkConfig::public(), NetworkConfig::testnet()]
            .into_iter()
            .map(|n| (n.name.clone(), n))
            .collect();
        Self {
            walker: AncestorChainWalker::new(ledger.clone()),
            ledger,
            networks,
        }
    }

    /// Adds or replaces a network.
    #[must_use]
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.networks.insert(network.name.clone(), network);
        self
    }

    /// The current record for `account`.
    pub async fn current_record(&self, account: &str, network: &str) -> Result<LineageRecord> {
        self.ledger
            .find_one(account, network)
            .await?
            .ok_or_else(|| LineageError::account_not_found(account, network))
    }

    /// The leaf-first creator chain for `account`.
    ///
    /// Fails with [`LineageError::NotFound`] when the account itself has no
    /// record.
    pub async fn ancestor_chain(&self, account: &str, network: &str) -> Result<Vec<LineageRecord>> {
        let chain = self.walker.walk(account, network).await?;
        if chain.is_empty() {
            return Err(LineageError::account_not_found(account, network));
        }
        Ok(chain)
    }

    /// The assembled tree for `account`, or `None` when it has no record.
    pub async fn tree(&self, account: &str, network: &str) -> Result<Option<TreeNode>> {
        let config = self
            .networks
            .get(network)
            .cloned()
            .ok_or_else(|| LineageError::Config(format!("unknown network {network}")))?;
        let chain = self.walker.walk(account, network).await?;
        TreeAssembler::new(config).assemble(&chain)
    }
}
