//! HTTP surface: `POST /upload` and `GET /health`

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::errors::ApiError;
use crate::pinata::PinataClient;

pub struct AppState {
    pub config: RelayConfig,
    pub pinata: PinataClient,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let Json(payload) = body.map_err(|rejection| {
        error!("[{}] Rejected upload body: {}", request_id, rejection.body_text());
        ApiError::new(
            rejection.status().as_u16(),
            format!("Invalid JSON body: {}", rejection.body_text()),
        )
        .with_request_id(request_id.clone())
    })?;
    info!("[{}] Uploading document to Pinata", request_id);

    let Some(credentials) = state.config.credentials() else {
        error!("[{}] Pinata credentials not configured", request_id);
        return Err(ApiError::missing_credentials().with_request_id(request_id));
    };

    match state.pinata.pin_json(&credentials, &payload).await {
        Ok(ipfs_hash) => {
            info!("[{}] Pinned as {}", request_id, ipfs_hash);
            Ok(Json(UploadResponse { ipfs_hash }))
        }
        Err(e) => {
            error!("[{}] Pinata upload error: {}", request_id, e);
            Err(ApiError::upload_failed(&e).with_request_id(request_id))
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Local Pinata upload server is running",
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
