//! Node registry.
//!
//! # Responsibilities
//! - Own every node of every service for the process lifetime
//! - Hand out copies of per-service state to readers
//! - Accept one atomic per-service batch from the health updater
//!
//! The set of services and the nodes inside them are fixed at construction;
//! only the liveness flags change afterwards.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::config::NodeConfig;
use crate::load_balancer::node::Node;

/// Rejected registry update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown service {0}")]
    UnknownService(String),

    #[error("service {service}: update has {actual} nodes, registry has {expected}")]
    ShapeMismatch {
        service: String,
        expected: usize,
        actual: usize,
    },

    #[error("service {service}: node at position {position} is not {expected}")]
    IdentityMismatch {
        service: String,
        position: usize,
        expected: String,
    },
}

/// Per-service node state behind a single reader/writer lock.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    services: RwLock<BTreeMap<String, Vec<Node>>>,
}

impl NodeRegistry {
    /// Build the registry from the configured node map. All nodes start dead.
    pub fn new(services: BTreeMap<String, Vec<NodeConfig>>) -> Self {
        let services = services
            .into_iter()
            .map(|(name, nodes)| (name, nodes.into_iter().map(Node::new).collect()))
            .collect();
        Self {
            services: RwLock::new(services),
        }
    }

    /// Names of all configured services.
    pub fn services(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Current state of one service, `None` if it is not configured.
    pub fn snapshot(&self, service: &str) -> Option<Vec<Node>> {
        self.read().get(service).cloned()
    }

    /// Current state of every service.
    pub fn all_nodes(&self) -> BTreeMap<String, Vec<Node>> {
        self.read().clone()
    }

    /// Replace a service's nodes with freshly probed copies of the same nodes.
    pub fn apply_update(&self, service: &str, updated: Vec<Node>) -> Result<(), RegistryError> {
        let mut services = self.write();
        let current = services
            .get_mut(service)
            .ok_or_else(|| RegistryError::UnknownService(service.to_string()))?;

        if current.len() != updated.len() {
            return Err(RegistryError::ShapeMismatch {
                service: service.to_string(),
                expected: current.len(),
                actual: updated.len(),
            });
        }
        if let Some(position) = current
            .iter()
            .zip(&updated)
            .position(|(old, new)| old.config != new.config)
        {
            return Err(RegistryError::IdentityMismatch {
                service: service.to_string(),
                position,
                expected: current[position].server().to_string(),
            });
        }

        *current = updated;
        Ok(())
    }

    /// `(true, [])` when every node is alive, else `(false, dead servers)` in registry order.
    pub fn status(&self) -> (bool, Vec<String>) {
        let failed: Vec<String> = self
            .read()
            .values()
            .flatten()
            .filter(|node| !node.is_alive())
            .map(|node| node.server().to_string())
            .collect();
        (failed.is_empty(), failed)
    }

    // Readers and the single writer never leave the map half-written, so a
    // poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<Node>>> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<Node>>> {
        self.services.write().unwrap_or_else(PoisonError::into_inner)
    }
}
