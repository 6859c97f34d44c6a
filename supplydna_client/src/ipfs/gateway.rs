//! Gateway resolver
//!
//! Mirrors are tried strictly in order, one request at a time. The first
//! mirror that answers with a 2xx JSON body wins and later mirrors are never
//! contacted. There is no retry within a mirror and no caching across calls.

use log::{debug, error, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::content_path;
use crate::errors::GatewayError;

pub const DEFAULT_GATEWAYS: [&str; 4] = [
    "https://ipfs.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
];

/// Per-mirror request timeout
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches JSON content by CID across an ordered list of gateway mirrors
#[derive(Debug, Clone)]
pub struct GatewayResolver {
    client: Client,
    gateways: Vec<String>,
}

impl GatewayResolver {
    pub fn new(gateways: Vec<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self { client, gateways })
    }

    /// Public mirrors with the standard 5s timeout
    pub fn with_defaults() -> Result<Self, GatewayError> {
        Self::new(
            DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            GATEWAY_TIMEOUT,
        )
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    /// Fetch and parse the JSON document at `uri` (a CID or `ipfs://` URI)
    pub async fn fetch_metadata(&self, uri: &str) -> Result<Value, GatewayError> {
        let path = content_path(uri);
        for gateway in &self.gateways {
            match self.fetch_from(gateway, path).await {
                Ok(value) => {
                    debug!("Resolved {} via {}", path, gateway);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Gateway {} failed, trying next...: {}", gateway, e);
                }
            }
        }
        error!("All IPFS gateways failed for {}", path);
        Err(GatewayError::AllGatewaysFailed {
            uri: path.to_string(),
            attempts: self.gateways.len(),
        })
    }

    async fn fetch_from(&self, gateway: &str, path: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(format!("{}{}", gateway, path))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}
