//! In-memory [`DocumentStore`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::{DocumentMetadata, DocumentRef, DocumentStore, StoredDocument};
use crate::errors::{LineageError, Result};

const HREF_SCHEME: &str = "memory://";

/// Documents kept in a concurrent map keyed by (collection, id).
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<DashMap<(String, String), StoredDocument>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of documents in one collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .count()
    }

    fn href(collection: &str, id: &str) -> String {
        format!("{HREF_SCHEME}{collection}/{id}")
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(
        &self,
        collection: &str,
        id: Option<&str>,
        metadata: &DocumentMetadata,
        payload: &Value,
    ) -> Result<DocumentRef> {
        let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        self.documents.insert(
            (collection.to_string(), id.clone()),
            StoredDocument {
                collection: collection.to_string(),
                id: id.clone(),
                metadata: metadata.clone(),
                raw_data: payload.clone(),
            },
        );
        Ok(DocumentRef {
            href: Self::href(collection, &id),
            id,
        })
    }

    async fn get(&self, href: &str) -> Result<StoredDocument> {
        let (collection, id) = href
            .strip_prefix(HREF_SCHEME)
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| LineageError::NotFound(format!("malformed document href {href}")))?;

        self.documents
            .get(&(collection.to_string(), id.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LineageError::NotFound(format!("document {href}")))
    }
}
