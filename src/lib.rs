//! Weighted random redirector library.
//!
//! Picks a healthy node of a service with probability proportional to its
//! weight and answers with a redirect; a background updater keeps node
//! liveness current.

pub mod cli;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod security;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{NodeRegistry, Pick, PickError, Picker, RandomWeighted};
