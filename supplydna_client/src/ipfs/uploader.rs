//! Metadata uploader
//!
//! Pinning goes through a relay that holds the Pinata credential. There is
//! exactly one endpoint and one attempt.

use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::UploadError;

/// Pins a JSON document and returns its content identifier
#[async_trait]
pub trait MetadataUploader: Send + Sync {
    async fn upload(&self, payload: &Value) -> Result<String, UploadError>;
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Uploader posting to the pinning relay's `/upload` endpoint
#[derive(Debug, Clone)]
pub struct RelayUploader {
    client: Client,
    endpoint: String,
}

impl RelayUploader {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| UploadError::UploadFailed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl MetadataUploader for RelayUploader {
    async fn upload(&self, payload: &Value) -> Result<String, UploadError> {
        info!("Uploading to Pinata via {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("IPFS upload error: {}", e);
                UploadError::UploadFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Relay rejected upload ({}): {}", status, body);
            return Err(UploadError::UploadFailed(format!(
                "relay responded with {}",
                status
            )));
        }

        let parsed: RelayResponse = response.json().await.map_err(|e| {
            error!("IPFS upload error: unreadable relay response: {}", e);
            UploadError::UploadFailed(format!("unreadable relay response: {}", e))
        })?;
        info!("Pinned metadata as {}", parsed.ipfs_hash);
        Ok(parsed.ipfs_hash)
    }
}
