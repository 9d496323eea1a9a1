//! Startup orchestration.
//!
//! Order: registry from config, startup node listing, prober, health
//! updater, picker, HTTP server. Any startup error is fatal.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::health::{HealthUpdater, Prober};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{NodeRegistry, Picker, RandomWeighted};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind the configured address and serve until `shutdown` fires.
pub async fn run(config: AppConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let address = config.server.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    serve(config, listener, shutdown).await
}

/// Serve on an already bound listener until `shutdown` fires.
pub async fn serve(
    config: AppConfig,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let registry = Arc::new(NodeRegistry::new(config.node_map()));
    let prober = Prober::new(config.health_check.timeout())?;

    let picker = Arc::new(RandomWeighted::new(
        registry.clone(),
        prober.clone(),
        config.failback().map(String::from),
    ));
    for (service, nodes) in picker.nodes() {
        let nodes: Vec<String> = nodes.iter().map(|n| n.config.to_string()).collect();
        tracing::info!(service = %service, nodes = ?nodes, "Service configured");
    }

    let updater = HealthUpdater::new(registry, prober, config.health_check.refresh())
        .spawn(shutdown.subscribe());

    let server = HttpServer::new(picker, &config)?;
    let served = server.run(listener, shutdown.subscribe()).await;

    // The server may stop on its own (listener error); make sure the updater stops too.
    shutdown.trigger();
    if let Err(e) = updater.await {
        tracing::error!(error = %e, "Health updater task failed");
    }

    served.map_err(StartupError::Serve)
}
