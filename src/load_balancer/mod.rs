//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Jump request (service, resource)
//!     → registry.rs (copy of the service's nodes, read lock only)
//!     → weighted_random.rs (alive nodes, weight-proportional draw)
//!     → optional HEAD re-check of the destination, failback on failure
//!     → Pick { url, node } or PickError
//! ```
//!
//! # Design Decisions
//! - The registry is the only shared state; the health updater is its sole writer
//! - Selection never blocks on probes, except the optional failback check
//! - Dead and zero-weight nodes are never selected

use std::collections::BTreeMap;
use std::future::Future;

use thiserror::Error;

pub mod node;
pub mod registry;
pub mod weighted_random;

pub use node::Node;
pub use registry::{NodeRegistry, RegistryError};
pub use weighted_random::RandomWeighted;

/// Result of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    /// Where the client is redirected to.
    pub url: String,
    /// The node chosen by the draw, even when `url` points at the failback.
    pub node: Node,
}

/// Selection failure surfaced to the front door.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("no such service {0}")]
    UnknownService(String),

    #[error("no node available for {0}")]
    NoNode(String),
}

/// What the front door needs from a node picker.
pub trait Picker: Send + Sync + 'static {
    /// Redirect destination for `resource` of `service`.
    fn pick(
        &self,
        service: &str,
        resource: &str,
    ) -> impl Future<Output = Result<Pick, PickError>> + Send;

    /// Every node of every service.
    fn nodes(&self) -> BTreeMap<String, Vec<Node>>;

    /// `(all alive, dead servers)`.
    fn status(&self) -> (bool, Vec<String>);
}
