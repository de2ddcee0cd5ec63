//! HTTP server.

use std::net::SocketAddr;
use tracing::info;
use versa_core::VersaConfig;

pub async fn run(config: &VersaConfig, memory: bool, address: SocketAddr) -> anyhow::Result<()> {
    let services = super::services(config, memory);
    let router = versa_api::create_router(services.api);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(%address, "Listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
