//! Relay error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MISSING_CREDENTIALS: &str = "Pinata credentials not configured. Please set PINATA_JWT, or PINATA_API_KEY and PINATA_SECRET_API_KEY environment variables.";

/// Failure talking to the Pinata API
#[derive(Debug, Error)]
pub enum PinataError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Pinata responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response carried no IpfsHash")]
    MissingHash,
}

/// Error body returned to relay callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: u16,
    pub error: String,
    pub timestamp: u64,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(code: u16, error: String) -> Self {
        Self {
            code,
            error,
            timestamp: chrono::Utc::now().timestamp() as u64,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn missing_credentials() -> Self {
        Self::new(500, MISSING_CREDENTIALS.to_string())
    }

    pub fn upload_failed(err: &PinataError) -> Self {
        Self::new(500, format!("Failed to upload to Pinata: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.error)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
