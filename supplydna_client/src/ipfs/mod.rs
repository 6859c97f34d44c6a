//! IPFS access: gateway reads with mirror fallback, and pinning through the
//! upload relay.

pub mod gateway;
pub mod uploader;

pub use gateway::{GatewayResolver, DEFAULT_GATEWAYS, GATEWAY_TIMEOUT};
pub use uploader::{MetadataUploader, RelayUploader};

/// Strip an `ipfs://` scheme so the CID can be appended to a gateway base
pub fn content_path(uri: &str) -> &str {
    let trimmed = uri.trim();
    trimmed.strip_prefix("ipfs://").unwrap_or(trimmed)
}

/// URI recorded on-chain for a pinned CID
pub fn metadata_uri(cid: &str) -> String {
    format!("ipfs://{}", cid)
}
