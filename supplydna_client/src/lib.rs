//! SupplyDNA traceability client
//!
//! Looks up supply-chain components in an on-chain registry, registers new
//! components (optionally minting an NFT certificate whose metadata is pinned
//! to IPFS through a relay), and derives presentation state such as the
//! lifecycle stage and the recent-lookup history.

pub mod config;
pub mod errors;
pub mod explorer;
pub mod history;
pub mod ipfs;
pub mod ledger;
pub mod metadata;
pub mod normalizer;
pub mod qr;
pub mod stage;
pub mod types;
pub mod workflow;

pub use errors::{GatewayError, HistoryError, LedgerError, QrError, UploadError, WorkflowError};
pub use types::ComponentRecord;
