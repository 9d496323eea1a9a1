//! Weighted random redirector.
//!
//! ```text
//!     Client ── GET /api/v1/jump/{svc}?url=/file ──▶ ┌──────────────┐
//!                                                    │  http server │
//!     Client ◀── 302 Location: node/file ─────────── └──────┬───────┘
//!                                                           │ pick
//!                                                    ┌──────▼───────┐    read lock
//!                                                    │ weighted     │──────────────┐
//!                                                    │ random picker│              │
//!                                                    └──────────────┘       ┌──────▼──────┐
//!                                                                           │node registry│
//!     Nodes ◀── HEAD/GET ping every refresh ──────── ┌──────────────┐       └──────▲──────┘
//!                                                    │health updater│──────────────┘
//!                                                    └──────────────┘    write lock
//! ```

use clap::Parser;

use redirect_balancer::cli::Cli;
use redirect_balancer::config::{read_config, validation::validate_config, ConfigError};
use redirect_balancer::lifecycle::{self, signals, Shutdown};
use redirect_balancer::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = read_config(&cli.conf)?;
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(cli.dbg, &config.observability.log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        conf = %cli.conf.display(),
        services = config.services.len(),
        refresh_secs = config.health_check.refresh_secs,
        timeout_secs = config.health_check.timeout_secs,
        failback = config.failback().unwrap_or("-"),
        "redirect-balancer starting"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    lifecycle::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
