//! Pinata `pinJSONToIPFS` client

use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::PinataCredentials;
use crate::errors::PinataError;

const PIN_JSON_PATH: &str = "/pinning/pinJSONToIPFS";

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

#[derive(Clone)]
pub struct PinataClient {
    client: reqwest::Client,
    api_url: String,
}

impl PinataClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, PinataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Pin `payload` and return its content identifier
    pub async fn pin_json(
        &self,
        credentials: &PinataCredentials,
        payload: &Value,
    ) -> Result<String, PinataError> {
        let url = format!("{}{}", self.api_url, PIN_JSON_PATH);
        debug!("Pinning JSON document via {}", url);

        let request = self
            .client
            .post(&url)
            .json(&json!({ "pinataContent": payload }));
        let request = match credentials {
            PinataCredentials::Jwt(jwt) => request.bearer_auth(jwt),
            PinataCredentials::ApiKey { key, secret } => request
                .header("pinata_api_key", key)
                .header("pinata_secret_api_key", secret),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let pinned: PinResponse = response.json().await?;
        pinned.ipfs_hash.ok_or(PinataError::MissingHash)
    }
}
