//! Genealogy reconstruction from flat lineage records.
//!
//! [`AncestorChainWalker`] follows `creator_account` links through the
//! ledger, leaf first. [`TreeAssembler`] nests that chain into one tree
//! rooted at the oldest ancestor. [`GenealogyService`] is the read surface
//! that combines both.

mod service;
mod tree;
mod walker;

pub use service::GenealogyService;
pub use tree::{IssuerNode, TreeAssembler, TreeNode};
pub use walker::AncestorChainWalker;
