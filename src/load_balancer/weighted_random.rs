//! Weighted random selection with failback verification.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;

use crate::health::probe::{ProbeMethod, Prober};
use crate::load_balancer::node::Node;
use crate::load_balancer::registry::NodeRegistry;
use crate::load_balancer::{Pick, PickError, Picker};

/// Picks an alive node with probability `weight / sum(alive weights)`.
#[derive(Debug, Clone)]
pub struct RandomWeighted {
    registry: Arc<NodeRegistry>,
    prober: Prober,
    failback: Option<String>,
}

impl RandomWeighted {
    /// `failback` is ignored when empty.
    pub fn new(registry: Arc<NodeRegistry>, prober: Prober, failback: Option<String>) -> Self {
        Self {
            registry,
            prober,
            failback: failback.filter(|f| !f.is_empty()),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Choose a node of `service` and build the redirect URL for `resource`.
    pub async fn select(&self, service: &str, resource: &str) -> Result<Pick, PickError> {
        tracing::debug!(service = %service, resource = %resource, "Pick");

        let nodes = self
            .registry
            .snapshot(service)
            .ok_or_else(|| PickError::UnknownService(service.to_string()))?;

        let node = choose_weighted(&nodes, &mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| PickError::NoNode(service.to_string()))?;

        let mut url = format!("{}{}", node.server(), resource);

        if let Some(failback) = &self.failback {
            if let Err(e) = self.prober.check(&url, ProbeMethod::Head).await {
                tracing::info!(
                    service = %service,
                    server = %node.server(),
                    error = %e,
                    "Picked node failed verification, using failback"
                );
                url = format!("{}{}", failback, resource);
            }
        }

        Ok(Pick { url, node })
    }
}

impl Picker for RandomWeighted {
    async fn pick(&self, service: &str, resource: &str) -> Result<Pick, PickError> {
        self.select(service, resource).await
    }

    fn nodes(&self) -> BTreeMap<String, Vec<Node>> {
        self.registry.all_nodes()
    }

    fn status(&self) -> (bool, Vec<String>) {
        self.registry.status()
    }
}

/// Uniform draw over the virtual pool where every eligible node appears
/// `weight` times. Dead and zero-weight nodes never appear.
pub fn choose_weighted<'a, R: Rng + ?Sized>(nodes: &'a [Node], rng: &mut R) -> Option<&'a Node> {
    let total: u64 = nodes
        .iter()
        .filter(|n| n.is_eligible())
        .map(|n| u64::from(n.weight()))
        .sum();
    if total == 0 {
        return None;
    }

    let mut slot = rng.gen_range(0..total);
    for node in nodes.iter().filter(|n| n.is_eligible()) {
        let weight = u64::from(node.weight());
        if slot < weight {
            return Some(node);
        }
        slot -= weight;
    }
    None
}
