//! Client configuration
//!
//! Layered from built-in defaults, an optional `supplydna.toml`, and
//! `SUPPLYDNA_*` environment variables (a `.env` file is honoured).

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ipfs::DEFAULT_GATEWAYS;

/// Relay endpoint used while developing against a local relay
pub const LOCAL_RELAY_ENDPOINT: &str = "http://localhost:5001/upload";
/// Relay path when served next to the deployed client
pub const DEPLOYED_RELAY_PATH: &str = "/api/pinata-upload";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Registry contract address
    #[serde(default)]
    pub contract_address: String,
    /// Network name, used for explorer links
    #[serde(default = "default_network")]
    pub network: String,
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Signing key; without one the wallet is unavailable
    #[serde(default)]
    pub private_key: Option<String>,
    /// Chain id for signing; asked from the node on first use when unset
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Blocks to wait before a registration counts as confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    /// Explicit relay endpoint, overriding the mode default
    #[serde(default)]
    pub upload_endpoint: Option<String>,
    #[serde(default)]
    pub mode: DeploymentMode,
    /// Origin the deployed relay path is joined onto
    #[serde(default)]
    pub deployment_base_url: Option<String>,
    #[serde(default = "default_gateways")]
    pub gateways: Vec<String>,
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Registration mints an NFT certificate
    #[serde(default)]
    pub mints_certificate: bool,
    /// Shared passphrase for the non-minting registration form
    #[serde(default = "default_passphrase")]
    pub registration_passphrase: String,
}

fn default_network() -> String {
    "polygon".to_string()
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_confirmations() -> usize {
    1
}

fn default_gateways() -> Vec<String> {
    DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
}

fn default_gateway_timeout_secs() -> u64 {
    5
}

fn default_history_path() -> PathBuf {
    PathBuf::from("recentComponents.json")
}

fn default_passphrase() -> String {
    "password".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            network: default_network(),
            rpc_url: default_rpc_url(),
            private_key: None,
            chain_id: None,
            confirmations: default_confirmations(),
            upload_endpoint: None,
            mode: DeploymentMode::default(),
            deployment_base_url: None,
            gateways: default_gateways(),
            gateway_timeout_secs: default_gateway_timeout_secs(),
            history_path: default_history_path(),
            mints_certificate: false,
            registration_passphrase: default_passphrase(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SUPPLYDNA")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("gateways")
}

impl ClientConfig {
    /// Load from `file` (or `./supplydna.toml` if present) and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();

        let builder = match file {
            Some(path) => Config::builder().add_source(File::from(path)),
            None => Config::builder().add_source(File::with_name("supplydna").required(false)),
        };
        Self::layered(builder, environment())
    }

    /// Environment variables override whatever `builder` already holds
    fn layered(
        builder: ConfigBuilder<DefaultState>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        builder.add_source(env).build()?.try_deserialize()
    }

    /// Parse a TOML document, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Relay endpoint: explicit override, else the mode default
    pub fn upload_endpoint(&self) -> String {
        if let Some(endpoint) = self.upload_endpoint.as_deref().filter(|e| !e.is_empty()) {
            return endpoint.to_string();
        }
        match self.mode {
            DeploymentMode::Development => LOCAL_RELAY_ENDPOINT.to_string(),
            DeploymentMode::Production => match self.deployment_base_url.as_deref() {
                Some(base) => format!("{}{}", base.trim_end_matches('/'), DEPLOYED_RELAY_PATH),
                None => DEPLOYED_RELAY_PATH.to_string(),
            },
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}
