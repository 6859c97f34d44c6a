//! Ledger accessor
//!
//! All registry access goes through a [`WalletSession`]. The accessor adds the
//! policy on top of the raw session: fail fast when no wallet is present,
//! authorize before every call, map zero-valued records to "not found", and
//! classify failures for the workflow.

pub mod ethers_session;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::errors::LedgerError;
use crate::types::ComponentRecord;

pub use ethers_session::EthersWalletSession;

/// Return tuple of the registry's `components(id)` view
pub type ComponentTuple = (String, String, String, String, String);

/// Failure reported by a wallet session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("user rejected the request: {0}")]
    Declined(String),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("{0}")]
    Transport(String),
}

impl SessionError {
    /// Revert reason or message, without the variant prefix
    pub fn reason(&self) -> &str {
        match self {
            SessionError::Declined(msg)
            | SessionError::Reverted(msg)
            | SessionError::Transport(msg) => msg,
        }
    }
}

/// Confirmed registration transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
}

/// Confirmed registration that minted a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub transaction_hash: String,
    pub token_id: String,
}

/// A user-approved connection to the registry contract
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Ask the wallet for account access; returns the active account
    async fn request_accounts(&self) -> Result<String, SessionError>;

    /// `components(id)` view call
    async fn components(&self, id: &str) -> Result<ComponentTuple, SessionError>;

    /// `registerComponent(...)`, resolved once the transaction is confirmed
    async fn register_component(
        &self,
        record: &ComponentRecord,
    ) -> Result<LedgerReceipt, SessionError>;

    /// `registerComponentWithMetadata(..., metadataURI)`, resolved once confirmed
    async fn register_component_with_metadata(
        &self,
        record: &ComponentRecord,
        metadata_uri: &str,
    ) -> Result<LedgerReceipt, SessionError>;

    /// `getTokenIdByComponentId(id)` view call
    async fn token_id_of(&self, id: &str) -> Result<String, SessionError>;
}

/// Registry reads and writes through an optional wallet session
#[derive(Clone)]
pub struct LedgerAccessor {
    wallet: Option<Arc<dyn WalletSession>>,
}

impl LedgerAccessor {
    pub fn new(wallet: Arc<dyn WalletSession>) -> Self {
        Self {
            wallet: Some(wallet),
        }
    }

    pub fn from_session(wallet: Option<Arc<dyn WalletSession>>) -> Self {
        Self { wallet }
    }

    /// Accessor for an environment with no wallet provider
    pub fn unavailable() -> Self {
        Self { wallet: None }
    }

    /// Wallet configured from `config`; no signing key means no wallet.
    /// Performs no I/O.
    pub fn from_config(config: &ClientConfig) -> Self {
        let session = match config.private_key.as_deref().filter(|k| !k.is_empty()) {
            Some(private_key) => {
                let session = EthersWalletSession::new(
                    config.rpc_url.clone(),
                    config.contract_address.clone(),
                    private_key,
                    config.chain_id,
                )
                .with_confirmations(config.confirmations);
                Some(Arc::new(session) as Arc<dyn WalletSession>)
            }
            None => {
                warn!("No wallet key configured; ledger access is unavailable");
                None
            }
        };
        Self::from_session(session)
    }

    fn session(&self) -> Result<&Arc<dyn WalletSession>, LedgerError> {
        self.wallet.as_ref().ok_or(LedgerError::WalletUnavailable)
    }

    /// Read a component; `Ok(None)` when the registry has no such id
    pub async fn read_component(&self, id: &str) -> Result<Option<ComponentRecord>, LedgerError> {
        let session = self.session()?;
        let account = session
            .request_accounts()
            .await
            .map_err(|e| LedgerError::ReadFailed(e.to_string()))?;
        debug!("Reading component {} as {}", id, account);

        let tuple = session.components(id).await.map_err(|e| {
            error!("Ledger read for {} failed: {}", id, e);
            LedgerError::ReadFailed(e.to_string())
        })?;
        let record = ComponentRecord::from_tuple(tuple);
        if record.is_blank() {
            debug!("Component {} not registered", id);
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Register a component and wait for confirmation
    pub async fn register_component(
        &self,
        record: &ComponentRecord,
    ) -> Result<LedgerReceipt, LedgerError> {
        let session = self.session()?;
        session
            .request_accounts()
            .await
            .map_err(registration_failed)?;

        let receipt = session
            .register_component(record)
            .await
            .map_err(registration_failed)?;
        info!(
            "Registered component {} in tx {}",
            record.id, receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Register a component with a metadata URI, then read back the minted
    /// certificate's token id
    pub async fn register_component_with_metadata(
        &self,
        record: &ComponentRecord,
        metadata_uri: &str,
    ) -> Result<MintReceipt, LedgerError> {
        let session = self.session()?;
        session
            .request_accounts()
            .await
            .map_err(registration_failed)?;

        let receipt = session
            .register_component_with_metadata(record, metadata_uri)
            .await
            .map_err(registration_failed)?;
        let token_id = session
            .token_id_of(&record.id)
            .await
            .map_err(registration_failed)?;
        info!(
            "Minted certificate #{} for component {} in tx {}",
            token_id, record.id, receipt.transaction_hash
        );
        Ok(MintReceipt {
            transaction_hash: receipt.transaction_hash,
            token_id,
        })
    }
}

fn registration_failed(err: SessionError) -> LedgerError {
    error!("Registration failed: {}", err);
    LedgerError::RegistrationFailed(err.reason().to_string())
}
