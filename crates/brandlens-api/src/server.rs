use crate::{create_router, AppState};
use brandlens_core::Result;
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { state, addr }
    }

    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state);

        info!("Starting BrandLens API server on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!("Server listening on http://{}", self.addr);
        info!("API documentation:");
        info!("  GET  /health - Service health");
        info!("  POST /v1/analyses - Run a brand visibility analysis");
        info!("  GET  /v1/analyses/latest - Latest stored analysis");
        info!("  POST /v1/competitor-analyses - Compare against competitors");
        info!("  GET  /v1/usage - Monthly usage against the subscription limit");
        info!("  GET  /v1/keys - Configured provider keys");
        info!("  POST /v1/keys/validate - Check an API key format");
        info!("  GET  /v1/cache/stats - Visibility cache statistics");
        info!("  POST /v1/cache/cleanup - Drop expired cache entries");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
