use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ApiServerConfig;
use crate::errors::Error;
use crate::service::SecretService;

use super::routes::{build_router, ApiState};

/// Start the HTTP API server and run it until ctrl-c.
pub async fn start_api_server(config: ApiServerConfig, service: SecretService) -> crate::Result<()> {
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address: {}", e)))?;

    if config.uses_default_api_key() {
        warn!("API_SECRET_KEY is the development placeholder, override it in production");
    }

    let router = build_router(ApiState::new(service, config.api_key));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::transport(format!("Failed to bind API server: {}", e)))?;

    info!(address = %addr, "Starting HTTP API server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "API server shutdown listener failed");
            }
        })
        .await
        .map_err(|e| Error::transport(format!("API server error: {}", e)))?;

    info!("API server shutdown completed");
    Ok(())
}
