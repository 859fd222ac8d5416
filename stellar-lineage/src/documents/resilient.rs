//! Retrying decorator for any [`DocumentStore`].

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::{DocumentMetadata, DocumentRef, DocumentStore, StoredDocument};
use crate::errors::Result;
use crate::pipeline::RetryPolicy;

/// Runs every store call through a [`RetryPolicy`].
///
/// Build the policy with a health hook tagged
/// [`crate::core::RATE_LIMITED_BY_DOCUMENT_STORE`] so exhaustion halts the
/// fleet.
#[derive(Clone)]
pub struct ResilientDocumentStore {
    inner: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl fmt::Debug for ResilientDocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientDocumentStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResilientDocumentStore {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl DocumentStore for ResilientDocumentStore {
    async fn put(
        &self,
        collection: &str,
        id: Option<&str>,
        metadata: &DocumentMetadata,
        payload: &Value,
    ) -> Result<DocumentRef> {
        let operation = format!("document_store.put.{collection}");
        self.policy
            .call(&operation, || self.inner.put(collection, id, metadata, payload))
            .await
    }

    async fn get(&self, href: &str) -> Result<StoredDocument> {
        self.policy
            .call("document_store.get", || self.inner.get(href))
            .await
    }
}
