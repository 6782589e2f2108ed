//! Metadata service client: item lookups by id.

use async_trait::async_trait;
use dataops_core::error::CoreError;
use dataops_core::resource::MetadataItem;
use serde::Deserialize;

use super::{ensure_success, ServiceClientError};

#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Fetch an item by id. Fails with `NotFound` when the service has no
    /// such item.
    async fn get_item(&self, item_id: &str) -> Result<MetadataItem, CoreError>;
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// HTTP client for `GET {base}/v1/item/{id}/`.
pub struct HttpMetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataClient {
    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, item_id: &str) -> Result<ItemEnvelope, ServiceClientError> {
        let response = self
            .client
            .get(format!("{}/v1/item/{item_id}/", self.base_url))
            .send()
            .await?;
        let response = ensure_success("metadata service", response).await?;
        Ok(response.json::<ItemEnvelope>().await?)
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn get_item(&self, item_id: &str) -> Result<MetadataItem, CoreError> {
        let envelope = self.fetch(item_id).await.map_err(|e| {
            tracing::error!(item_id, error = %e, "Metadata lookup failed");
            CoreError::from(e)
        })?;

        let result = envelope
            .result
            .filter(|v| !v.is_null() && v.as_object().is_none_or(|o| !o.is_empty()))
            .ok_or_else(|| {
                tracing::warn!(item_id, "Item not found in metadata service");
                CoreError::NotFound(format!("Item {item_id} not found"))
            })?;

        serde_json::from_value(result)
            .map_err(|e| CoreError::Unhandled(format!("Malformed metadata item {item_id}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = HttpMetadataClient::with_client(reqwest::Client::new(), "http://meta:5066/");
        assert_eq!(client.base_url, "http://meta:5066");
    }
}
