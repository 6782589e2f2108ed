//! Queue service client: hands operations to the pipeline workers.

use async_trait::async_trait;
use dataops_core::error::CoreError;
use serde::Serialize;

use super::{ensure_success, ServiceClientError};

/// Message body accepted by `POST {base}/v1/send_message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueMessage {
    pub event_type: String,
    pub payload: serde_json::Value,
    /// Unix seconds with sub-second precision.
    pub create_timestamp: f64,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn send_message(&self, message: &QueueMessage) -> Result<(), CoreError>;
}

pub struct HttpQueueClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQueueClient {
    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, message: &QueueMessage) -> Result<(), ServiceClientError> {
        let response = self
            .client
            .post(format!("{}/v1/send_message", self.base_url))
            .json(message)
            .send()
            .await?;
        ensure_success("queue service", response).await?;
        Ok(())
    }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn send_message(&self, message: &QueueMessage) -> Result<(), CoreError> {
        self.post(message).await.map_err(|e| {
            tracing::error!(event_type = %message.event_type, error = %e, "Queue submission failed");
            CoreError::from(e)
        })?;
        tracing::info!(event_type = %message.event_type, "Message sent to queue");
        Ok(())
    }
}
