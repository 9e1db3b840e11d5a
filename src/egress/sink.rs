//! Upload destinations
//!
//! A storage sink stores artifact bytes and returns an opaque locator. The
//! operation is assumed idempotent-enough for simple retry; on failure the
//! caller keeps the artifact and may try again.

use async_trait::async_trait;

use crate::utils::error::{PipelineError, PipelineResult};

/// External storage collaborator: store bytes, get back a locator
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Transmit `data` and return an opaque locator for the stored object.
    async fn put(&self, data: &[u8], media_type: &str) -> PipelineResult<String>;
}

/// Uploads artifacts with an HTTP `PUT` to a pre-authorized URL
pub struct HttpStorageSink {
    client: reqwest::Client,
    destination: String,
}

impl HttpStorageSink {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl StorageSink for HttpStorageSink {
    async fn put(&self, data: &[u8], media_type: &str) -> PipelineResult<String> {
        tracing::info!(
            destination = %self.destination,
            bytes = data.len(),
            media_type,
            "starting upload"
        );

        let response = self
            .client
            .put(&self.destination)
            .header("Content-Type", media_type)
            .header("Content-Length", data.len())
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| PipelineError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::UploadFailed(format!(
                "upload failed with status: {}",
                response.status()
            )));
        }

        // Some destinations answer with the stored object's locator; for
        // those that answer empty, the destination URL itself locates it.
        let body = response.text().await.unwrap_or_default();
        let locator = if body.trim().is_empty() {
            self.destination.clone()
        } else {
            body.trim().to_string()
        };

        tracing::info!(%locator, "upload successful");
        Ok(locator)
    }
}
