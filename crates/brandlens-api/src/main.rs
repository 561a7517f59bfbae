use brandlens_api::{AppState, Server};
use brandlens_core::{BrandLensError, ConfigManager, LoggingConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> brandlens_core::Result<()> {
    let manager = ConfigManager::load().map_err(|e| BrandLensError::Config(e.to_string()))?;
    let config = manager.config().clone();
    init_tracing(&config.logging);

    let addr: SocketAddr = config.api.bind_addr.parse().map_err(|e| {
        BrandLensError::Config(format!(
            "invalid bind address '{}': {}",
            config.api.bind_addr, e
        ))
    })?;

    let state = AppState::from_config(config)?;
    Server::new(addr, state).run().await
}

/// RUST_LOG wins; otherwise the configured level is used as the filter
/// directive (a bare level applies globally).
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
