//! NFT certificate view: metadata resolved through the gateway mirrors, plus
//! the explorer link for the minted token.

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::errors::WorkflowError;
use crate::explorer;
use crate::ipfs::GatewayResolver;
use crate::metadata::NftMetadata;

#[derive(Debug, Clone, Serialize)]
pub struct CertificateView {
    pub component_id: String,
    pub token_id: String,
    pub metadata_uri: String,
    /// Raw metadata document as served by the gateway
    pub metadata: Value,
    pub explorer_url: String,
}

impl CertificateView {
    /// Metadata in the shape this client mints, if it matches
    pub fn typed_metadata(&self) -> Option<NftMetadata> {
        serde_json::from_value(self.metadata.clone()).ok()
    }
}

pub struct CertificateResolver {
    gateway: GatewayResolver,
    network: String,
    contract_address: String,
}

impl CertificateResolver {
    pub fn new(
        gateway: GatewayResolver,
        network: impl Into<String>,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            network: network.into(),
            contract_address: contract_address.into(),
        }
    }

    pub async fn resolve(
        &self,
        component_id: &str,
        metadata_uri: &str,
        token_id: &str,
    ) -> Result<CertificateView, WorkflowError> {
        let metadata = self.gateway.fetch_metadata(metadata_uri).await.map_err(|e| {
            warn!("Failed to load NFT metadata for {}: {}", component_id, e);
            e
        })?;
        Ok(CertificateView {
            component_id: component_id.to_string(),
            token_id: token_id.to_string(),
            metadata_uri: metadata_uri.to_string(),
            metadata,
            explorer_url: explorer::token_url(&self.network, &self.contract_address, token_id),
        })
    }
}
