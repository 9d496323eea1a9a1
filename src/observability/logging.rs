//! Structured logging.
//!
//! `RUST_LOG` always wins. Otherwise debug mode logs this crate and the HTTP
//! trace layer at debug, and normal mode uses the configured level.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for the given mode.
pub fn default_directive(debug: bool, level: &str) -> String {
    if debug {
        "redirect_balancer=debug,tower_http=debug".to_string()
    } else {
        format!("redirect_balancer={},tower_http=warn", level)
    }
}

/// Install the global subscriber.
pub fn init_logging(debug: bool, level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug, level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(debug)
                .with_line_number(debug),
        )
        .try_init()
}
