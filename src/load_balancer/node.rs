//! Node abstraction.
//!
//! # Responsibilities
//! - Represent a single configured backend of a service
//! - Carry the runtime liveness flags next to the immutable configuration

use std::fmt;

use serde::Serialize;

use crate::config::NodeConfig;

/// A configured node plus its most recent probe outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Immutable part loaded from configuration.
    #[serde(flatten)]
    pub config: NodeConfig,
    /// Last refresh cycle's probe succeeded.
    alive: bool,
    /// The last refresh cycle flipped `alive`.
    changed: bool,
}

impl Node {
    /// A node that has not been probed yet (dead until proven alive).
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            alive: false,
            changed: false,
        }
    }

    pub fn server(&self) -> &str {
        &self.config.server
    }

    pub fn weight(&self) -> u32 {
        self.config.weight
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// True when the node can receive traffic.
    pub fn is_eligible(&self) -> bool {
        self.alive && self.config.weight > 0
    }

    /// Copy of this node after a probe with the given outcome.
    pub fn observe(&self, alive: bool) -> Self {
        Self {
            config: self.config.clone(),
            alive,
            changed: alive != self.alive,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} alive:{}", self.config, self.alive)
    }
}
