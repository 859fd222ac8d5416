//! Nested genealogy tree for visualization.

use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;
use crate::core::{AccountAsset, AccountFlag, LineageRecord};
use crate::errors::Result;
use crate::utils::Timestamp;

/// One node of the genealogy tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreeNode {
    /// An account in the chain.
    Issuer(IssuerNode),
    /// An asset held by the parent issuer.
    Asset(AccountAsset),
    /// A flag of the parent issuer.
    Flag(AccountFlag),
}

/// An account node. Its first child is the next younger account in the
/// chain, if any, followed by its own assets and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerNode {
    /// When the account was created, if known.
    pub created: Option<Timestamp>,
    /// The account.
    pub account: String,
    /// Its creator, or the creator sentinel.
    pub creator_account: String,
    /// Home domain, or the home-domain sentinel.
    pub home_domain: String,
    /// Native balance.
    pub balance: f64,
    /// Block explorer page for the account.
    pub external_explorer_link: String,
    /// The younger issuer, then assets and flags.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Returns the issuer payload for issuer nodes.
    #[must_use]
    pub const fn as_issuer(&self) -> Option<&IssuerNode> {
        match self {
            Self::Issuer(node) => Some(node),
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Issuer(node) => 1 + node.children.iter().map(Self::node_count).sum::<usize>(),
            _ => 1,
        }
    }

    /// Number of issuer nodes in this subtree.
    #[must_use]
    pub fn issuer_count(&self) -> usize {
        match self {
            Self::Issuer(node) => {
                1 + node
                    .children
                    .iter()
                    .map(Self::issuer_count)
                    .sum::<usize>()
            }
            _ => 0,
        }
    }
}

impl IssuerNode {
    /// The nested younger issuer, if any.
    #[must_use]
    pub fn descendant(&self) -> Option<&Self> {
        self.children.iter().find_map(TreeNode::as_issuer)
    }
}

/// Builds the tree from a leaf-first ancestor chain.
#[derive(Debug, Clone)]
pub struct TreeAssembler {
    network: NetworkConfig,
}

impl TreeAssembler {
    /// Creates an assembler producing explorer links for `network`.
    #[must_use]
    pub const fn new(network: NetworkConfig) -> Self {
        Self { network }
    }

    /// Nests `chain` so the oldest ancestor is the root and the first
    /// record of the chain is the deepest issuer. An empty chain gives
    /// `None`.
    pub fn assemble(&self, chain: &[LineageRecord]) -> Result<Option<TreeNode>> {
        let mut nested: Option<TreeNode> = None;

        for record in chain {
            let mut children: Vec<TreeNode> = nested.take().into_iter().collect();
            children.extend(record.assets()?.into_iter().map(TreeNode::Asset));
            children.extend(record.flags()?.into_iter().map(TreeNode::Flag));

            nested = Some(TreeNode::Issuer(IssuerNode {
                created: record.account_created_at,
                account: record.account.clone(),
                creator_account: record.creator_account.clone(),
                home_domain: record.home_domain.clone(),
                balance: record.native_balance,
                external_explorer_link: self.network.explorer_account_link(&record.account),
                children,
            }));
        }

        Ok(nested)
    }
}
