//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Health updater (updater.rs):
//!     Sleep refresh period
//!     → For each service, probe every node concurrently (probe.rs)
//!     → Join all probes of the service
//!     → Publish alive/changed flags to the registry in one write
//! ```
//!
//! # Design Decisions
//! - One probe per node per cycle, no retries; a failure waits for the next cycle
//! - A node's liveness reflects only the latest cycle, there is no hysteresis
//! - Probe errors never escape the updater

pub mod probe;
pub mod updater;

pub use probe::{ProbeError, ProbeMethod, Prober};
pub use updater::HealthUpdater;
