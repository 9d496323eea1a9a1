//! Background liveness refresh.
//!
//! # Responsibilities
//! - Every refresh period, probe all nodes of every service in parallel
//! - Publish each service's results to the registry as one batch
//! - Log a per-service summary only when a node flipped

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::health::probe::Prober;
use crate::load_balancer::{Node, NodeRegistry};
use crate::observability::metrics;

/// Sole writer of the node registry.
#[derive(Debug, Clone)]
pub struct HealthUpdater {
    registry: Arc<NodeRegistry>,
    prober: Prober,
    refresh: Duration,
}

impl HealthUpdater {
    pub fn new(registry: Arc<NodeRegistry>, prober: Prober, refresh: Duration) -> Self {
        Self {
            registry,
            prober,
            refresh,
        }
    }

    /// Start the refresh loop on the runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Refresh until shutdown. The first cycle starts immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            refresh = ?self.refresh,
            timeout = ?self.prober.timeout(),
            services = self.registry.services().len(),
            "Health updater started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = self.refresh_all() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = time::sleep(self.refresh) => {}
            }
        }

        tracing::info!("Health updater received shutdown signal, exiting loop");
    }

    /// One refresh cycle over all services. Services publish independently.
    pub async fn refresh_all(&self) {
        let services = self.registry.services();
        join_all(services.iter().map(|service| self.refresh_service(service))).await;
    }

    /// Probe every node of `service` and publish the batch. Returns the number of flips.
    pub async fn refresh_service(&self, service: &str) -> usize {
        let Some(nodes) = self.registry.snapshot(service) else {
            return 0;
        };

        // Detached tasks: if the cycle is abandoned at shutdown, in-flight
        // probes run out their own timeout and their results are dropped.
        let probes: Vec<JoinHandle<Node>> = nodes
            .iter()
            .cloned()
            .map(|node| {
                let prober = self.prober.clone();
                let service = service.to_string();
                tokio::spawn(async move { probe_node(&prober, &service, node).await })
            })
            .collect();

        let updated: Vec<Node> = join_all(probes)
            .await
            .into_iter()
            .zip(&nodes)
            .map(|(joined, previous)| {
                joined.unwrap_or_else(|e| {
                    tracing::warn!(service = %service, server = %previous.server(), error = %e, "Probe task failed");
                    previous.observe(false)
                })
            })
            .collect();

        let changed = updated.iter().filter(|n| n.is_changed()).count();
        let alive = updated.iter().filter(|n| n.is_alive()).count();
        for node in &updated {
            metrics::record_node_alive(service, node.server(), node.is_alive());
        }

        if let Err(e) = self.registry.apply_update(service, updated) {
            tracing::error!(service = %service, error = %e, "Failed to publish health update");
            return 0;
        }

        if changed > 0 {
            tracing::info!(
                service = %service,
                changed,
                total = nodes.len(),
                passed = alive,
                failed = nodes.len() - alive,
                "Alive counts updated"
            );
        }
        changed
    }
}

async fn probe_node(prober: &Prober, service: &str, node: Node) -> Node {
    let url = node.config.ping_url();
    let result = prober.probe(&url, &node.config.method).await;
    if let Err(e) = &result {
        tracing::debug!(service = %service, error = %e, "Probe failed");
    }

    let checked = node.observe(result.is_ok());
    if checked.is_changed() {
        tracing::info!(
            service = %service,
            server = %node.server(),
            from = node.is_alive(),
            to = checked.is_alive(),
            "Changed node status"
        );
    }
    checked
}
