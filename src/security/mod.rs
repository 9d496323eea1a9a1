//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming jump request:
//!     → rate_limit.rs (per-IP token bucket)
//!     → Pass to the redirect handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: an empty bucket is answered with 429, never queued
//! - Status and ping endpoints are not rate limited

pub mod rate_limit;
