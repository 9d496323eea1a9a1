//! HTTP front door subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → rate limit, then bench timing (jump routes only)
//!     → request.rs (query, client IP, referer)
//!     → picker chooses node → 302 Location or 404
//!     → stats.rs (detached usage report)
//! ```

pub mod bench;
pub mod request;
pub mod server;
pub mod stats;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
pub use stats::{LogRecord, StatsSubmitter};
