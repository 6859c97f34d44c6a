//! Error types for the traceability client
//!
//! Each layer has its own error enum; the workflow layer folds them into
//! [`WorkflowError`], which carries the message shown to the user.

use thiserror::Error;

/// Failure to resolve content through the IPFS gateway mirrors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("All IPFS gateways failed for {uri} ({attempts} tried)")]
    AllGatewaysFailed { uri: String, attempts: usize },
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Failure to pin metadata through the relay
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to upload to IPFS: {0}")]
    UploadFailed(String),
}

/// Failure reported by the ledger accessor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("MetaMask is required.")]
    WalletUnavailable,
    #[error("Ledger read failed: {0}")]
    ReadFailed(String),
    #[error("{0}")]
    RegistrationFailed(String),
    #[error("Invalid ledger configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of the local recent-lookup store
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("History store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failure to read a QR code from an image file
#[derive(Debug, Error)]
pub enum QrError {
    #[error("Failed to read image: {0}")]
    Image(#[from] image::ImageError),
    #[error("No QR code found in image")]
    NoCode,
    #[error("Failed to decode QR code: {0}")]
    Decode(String),
}

/// Failure of a lookup or registration, surfaced to the user
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    ValidationFailed(String),
    #[error("Another request is already in flight")]
    Busy,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl WorkflowError {
    /// Message for the lookup surface
    pub fn lookup_message(&self) -> String {
        match self {
            WorkflowError::Ledger(LedgerError::WalletUnavailable) => {
                "Please install MetaMask to use this feature!".to_string()
            }
            WorkflowError::Ledger(_) | WorkflowError::Gateway(_) => {
                "Error during lookup, please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Message for the registration surface
    pub fn registration_message(&self) -> String {
        match self {
            WorkflowError::Ledger(LedgerError::RegistrationFailed(reason)) => {
                format!("Registration failed. {}", reason)
            }
            WorkflowError::Upload(err) => format!("Registration failed. {}", err),
            other => other.to_string(),
        }
    }
}
