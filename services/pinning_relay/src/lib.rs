//! Pinning relay: holds the Pinata credential server-side and pins JSON
//! documents on behalf of the traceability client.

pub mod config;
pub mod errors;
pub mod pinata;
pub mod routes;

pub use config::{PinataCredentials, RelayConfig};
pub use errors::{ApiError, PinataError};
pub use routes::{router, AppState};
