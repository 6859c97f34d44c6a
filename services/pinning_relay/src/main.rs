use anyhow::Context;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use pinning_relay::{pinata::PinataClient, router, AppState, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = RelayConfig::from_env();
    if config.credentials().is_none() {
        warn!("Set PINATA_JWT, or PINATA_API_KEY and PINATA_SECRET_API_KEY, before uploading");
    }

    let pinata = PinataClient::new(config.pinata_api_url.clone())?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(Arc::new(AppState { config, pinata }));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Pinata upload relay running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
