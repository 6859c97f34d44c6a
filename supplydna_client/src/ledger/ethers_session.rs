//! Wallet session backed by ethers-rs
//!
//! Signs with a local key over a JSON-RPC HTTP provider and talks to the
//! SupplyDNA registry through `abigen!` bindings.

use async_trait::async_trait;
use ethers::prelude::*;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{ComponentTuple, LedgerReceipt, SessionError, WalletSession};
use crate::types::ComponentRecord;

abigen!(
    SupplyDnaRegistry,
    r#"[
        function components(string) view returns (string id, string name, string supplier, string batch, string date)
        function registerComponent(string id, string name, string supplier, string batch, string date)
        function registerComponentWithMetadata(string id, string name, string supplier, string batch, string date, string metadataURI)
        function getTokenIdByComponentId(string id) view returns (uint256)
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Provider, signer and contract binding, built on first use
struct Registry {
    account: Address,
    contract: SupplyDnaRegistry<SignerClient>,
}

/// Local-key wallet session against the registry contract
///
/// Construction performs no I/O. Parsing the settings and resolving the chain
/// id happen on the first ledger call, so misconfiguration surfaces through
/// that call's error.
pub struct EthersWalletSession {
    rpc_url: String,
    contract_address: String,
    private_key: String,
    chain_id: Option<u64>,
    confirmations: usize,
    registry: OnceCell<Registry>,
}

impl EthersWalletSession {
    /// Session for the registry at `contract_address` on `rpc_url`, signing
    /// with `private_key`. Without `chain_id` it is asked from the node.
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: impl Into<String>,
        private_key: impl Into<String>,
        chain_id: Option<u64>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
            private_key: private_key.into(),
            chain_id,
            confirmations: 1,
            registry: OnceCell::new(),
        }
    }

    /// Blocks to wait before a write counts as confirmed
    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    async fn registry(&self) -> Result<&Registry, SessionError> {
        self.registry.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Registry, SessionError> {
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())
            .map_err(|e| SessionError::Transport(format!("Invalid RPC URL: {}", e)))?;

        let address = self
            .contract_address
            .parse::<Address>()
            .map_err(|e| SessionError::Transport(format!("Invalid contract address: {}", e)))?;

        let wallet = self
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| SessionError::Transport(format!("Invalid private key: {}", e)))?;

        let chain_id = match self.chain_id {
            Some(chain_id) => chain_id,
            None => provider
                .get_chainid()
                .await
                .map_err(|e| SessionError::Transport(format!("Failed to get chain ID: {}", e)))?
                .as_u64(),
        };
        let wallet = wallet.with_chain_id(chain_id);
        let account = wallet.address();

        info!(
            "Wallet {:?} connected to chain {} (registry {:?})",
            account, chain_id, address
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Ok(Registry {
            account,
            contract: SupplyDnaRegistry::new(address, client),
        })
    }

    async fn submit(&self, call: ContractCall<SignerClient, ()>) -> Result<LedgerReceipt, SessionError> {
        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = pending.tx_hash();
        debug!("Transaction sent: {:?}", tx_hash);

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(|e| SessionError::Transport(format!("Failed to get confirmation: {}", e)))?;

        match receipt {
            Some(receipt) if receipt.status == Some(U64::from(1)) => Ok(LedgerReceipt {
                transaction_hash: format!("{:?}", receipt.transaction_hash),
                block_number: receipt.block_number.map(|b| b.as_u64()),
            }),
            Some(_) => Err(SessionError::Reverted(format!(
                "transaction {:?} failed on-chain",
                tx_hash
            ))),
            None => Err(SessionError::Transport(format!(
                "transaction {:?} dropped",
                tx_hash
            ))),
        }
    }
}

fn contract_error(err: ContractError<SignerClient>) -> SessionError {
    match err.decode_revert::<String>() {
        Some(reason) => SessionError::Reverted(reason),
        None => SessionError::Transport(err.to_string()),
    }
}

#[async_trait]
impl WalletSession for EthersWalletSession {
    async fn request_accounts(&self) -> Result<String, SessionError> {
        // A local key needs no prompt; its address is the only account.
        Ok(format!("{:?}", self.registry().await?.account))
    }

    async fn components(&self, id: &str) -> Result<ComponentTuple, SessionError> {
        self.registry()
            .await?
            .contract
            .components(id.to_string())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn register_component(
        &self,
        record: &ComponentRecord,
    ) -> Result<LedgerReceipt, SessionError> {
        let registry = self.registry().await?;
        let call = registry.contract.register_component(
            record.id.clone(),
            record.name.clone(),
            record.supplier.clone(),
            record.batch.clone(),
            record.date.clone(),
        );
        self.submit(call).await
    }

    async fn register_component_with_metadata(
        &self,
        record: &ComponentRecord,
        metadata_uri: &str,
    ) -> Result<LedgerReceipt, SessionError> {
        let registry = self.registry().await?;
        let call = registry.contract.register_component_with_metadata(
            record.id.clone(),
            record.name.clone(),
            record.supplier.clone(),
            record.batch.clone(),
            record.date.clone(),
            metadata_uri.to_string(),
        );
        self.submit(call).await
    }

    async fn token_id_of(&self, id: &str) -> Result<String, SessionError> {
        self.registry()
            .await?
            .contract
            .get_token_id_by_component_id(id.to_string())
            .call()
            .await
            .map(|token_id| token_id.to_string())
            .map_err(contract_error)
    }
}
