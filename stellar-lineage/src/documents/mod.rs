//! Storage for raw upstream responses.
//!
//! Stages write each Horizon response into a named collection and keep the
//! returned href on the lineage record. Passing the id recovered from an
//! existing href makes a re-run replace the document instead of adding one.

#[cfg(feature = "http")]
mod http;
mod memory;
mod resilient;

#[cfg(feature = "http")]
pub use http::HttpDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use resilient::ResilientDocumentStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// Collection holding account snapshots.
pub const HORIZON_ACCOUNTS: &str = "horizon_accounts";
/// Collection holding operations pages.
pub const HORIZON_OPERATIONS: &str = "horizon_operations";
/// Collection holding effects pages.
pub const HORIZON_EFFECTS: &str = "horizon_effects";

/// Where a stored document lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document id within its collection.
    pub id: String,
    /// Full address usable with [`DocumentStore::get`].
    pub href: String,
}

/// Who a document belongs to and what it mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Owning account.
    pub account: String,
    /// Network name.
    pub network: String,
    /// Upstream URL the payload was fetched from.
    pub external_url: String,
}

impl DocumentMetadata {
    /// Creates metadata.
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        network: impl Into<String>,
        external_url: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            network: network.into(),
            external_url: external_url.into(),
        }
    }
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Collection name.
    pub collection: String,
    /// Document id.
    pub id: String,
    /// Ownership metadata.
    pub metadata: DocumentMetadata,
    /// The raw upstream response.
    pub raw_data: Value,
}

/// Idempotent document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Writes `payload` under `id`, or under a fresh id when `id` is `None`.
    ///
    /// Writing an existing id replaces its content and returns the same href.
    async fn put(
        &self,
        collection: &str,
        id: Option<&str>,
        metadata: &DocumentMetadata,
        payload: &Value,
    ) -> Result<DocumentRef>;

    /// Reads a document by href.
    async fn get(&self, href: &str) -> Result<StoredDocument>;
}
