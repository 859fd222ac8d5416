//! Document store over a JSON document HTTP API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use super::{DocumentMetadata, DocumentRef, DocumentStore, StoredDocument};
use crate::config::DocumentStoreConfig;
use crate::errors::{LineageError, Result, UpstreamError};
use crate::upstream::send_json;

const API: &str = "document_store";

#[derive(Serialize)]
struct PatchBody<'a> {
    stellar_account: &'a str,
    network_name: &'a str,
    external_url: &'a str,
    raw_data: &'a Value,
}

#[derive(Deserialize)]
struct PatchResponse {
    #[serde(rename = "documentId")]
    document_id: String,
}

#[derive(Deserialize)]
struct StoredBody {
    #[serde(default)]
    stellar_account: String,
    #[serde(default)]
    network_name: String,
    #[serde(default)]
    external_url: String,
    #[serde(default)]
    raw_data: Value,
}

/// Upserts documents with `PATCH {base}/collections/{collection}/{id}`.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    http: Client,
    base_url: String,
    token: Option<String>,
    token_header: String,
}

impl HttpDocumentStore {
    /// Creates a client for the configured endpoint.
    pub fn new(config: &DocumentStoreConfig, timeout: Duration) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(LineageError::Config(
                "document_store.base_url is required".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LineageError::Config(format!("document store client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            token_header: config.token_header.clone(),
        })
    }

    /// URL of one document.
    #[must_use]
    pub fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/collections/{collection}/{id}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(self.token_header.as_str(), token),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn put(
        &self,
        collection: &str,
        id: Option<&str>,
        metadata: &DocumentMetadata,
        payload: &Value,
    ) -> Result<DocumentRef> {
        let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let url = self.document_url(collection, &id);
        let body = PatchBody {
            stellar_account: &metadata.account,
            network_name: &metadata.network,
            external_url: &metadata.external_url,
            raw_data: payload,
        };

        let request = self.authorized(self.http.patch(&url).json(&body));
        let response = send_json(request, API, &url).await?;
        let parsed: PatchResponse =
            serde_json::from_value(response).map_err(|e| UpstreamError::Decode {
                api: API.to_string(),
                url: url.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(collection, document_id = %parsed.document_id, "Stored document");
        Ok(DocumentRef {
            href: self.document_url(collection, &parsed.document_id),
            id: parsed.document_id,
        })
    }

    async fn get(&self, href: &str) -> Result<StoredDocument> {
        let mut segments = href.trim_end_matches('/').rsplit('/');
        let (Some(id), Some(collection)) = (segments.next(), segments.next()) else {
            return Err(LineageError::NotFound(format!(
                "malformed document href {href}"
            )));
        };

        let request = self.authorized(self.http.get(href));
        let mut response = send_json(request, API, href).await?;
        // The API wraps stored documents in a `data` envelope.
        if let Some(data) = response.get_mut("data") {
            response = data.take();
        }
        let body: StoredBody = serde_json::from_value(response).map_err(|e| UpstreamError::Decode {
            api: API.to_string(),
            url: href.to_string(),
            message: e.to_string(),
        })?;

        Ok(StoredDocument {
            collection: collection.to_string(),
            id: id.to_string(),
            metadata: DocumentMetadata::new(body.stellar_account, body.network_name, body.external_url),
            raw_data: body.raw_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_base_url() {
        let err = HttpDocumentStore::new(&DocumentStoreConfig::default(), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, LineageError::Config(_)));
    }

    #[test]
    fn test_document_url() {
        let config = DocumentStoreConfig {
            base_url: "https://docs.example/api/namespaces/lineage/".to_string(),
            ..DocumentStoreConfig::default()
        };
        let store = HttpDocumentStore::new(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.document_url("horizon_accounts", "abc"),
            "https://docs.example/api/namespaces/lineage/collections/horizon_accounts/abc"
        );
    }

    #[test]
    fn test_patch_body_shape() {
        let payload = serde_json::json!({"id": "GA"});
        let body = PatchBody {
            stellar_account: "GA",
            network_name: "public",
            external_url: "https://horizon.stellar.org/accounts/GA",
            raw_data: &payload,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["stellar_account"], "GA");
        assert_eq!(value["raw_data"]["id"], "GA");
    }
}
