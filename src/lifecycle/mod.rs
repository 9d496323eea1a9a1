//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Registry → Health updater → Picker → HTTP server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop refresh cycles + stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - In-flight probes are not cancelled; their results are discarded
//! - Listeners start last, after the updater is running

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, serve, StartupError};
