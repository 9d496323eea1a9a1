//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the redirector.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the redirector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Front door settings (bind address, failback, stats collector).
    pub server: ServerConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Service name -> ordered node list.
    pub services: BTreeMap<String, Vec<NodeConfig>>,
}

impl AppConfig {
    /// Service map with load-time defaults applied (method upper-cased, HEAD when empty).
    pub fn node_map(&self) -> BTreeMap<String, Vec<NodeConfig>> {
        self.services
            .iter()
            .map(|(name, nodes)| {
                let nodes = nodes.iter().cloned().map(NodeConfig::normalized).collect();
                (name.clone(), nodes)
            })
            .collect()
    }

    /// Failback base URL, `None` when unset or empty.
    pub fn failback(&self) -> Option<&str> {
        self.server.failback.as_deref().filter(|s| !s.is_empty())
    }

    /// Stats collector URL, `None` when unset or empty.
    pub fn stats_url(&self) -> Option<&str> {
        self.server.stats_url.as_deref().filter(|s| !s.is_empty())
    }
}

/// Front door configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// HTML body returned with 404 when no node can be picked.
    pub no_node_message: String,

    /// Static archive used when the picked node fails its final check.
    pub failback: Option<String>,

    /// Usage statistics collector.
    pub stats_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            no_node_message: "no node available".to_string(),
            failback: None,
            stats_url: None,
        }
    }
}

/// One configured backend of a service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Base URL, resources are appended verbatim.
    pub server: String,

    /// Path appended to `server` for liveness probes.
    #[serde(default)]
    pub ping: String,

    /// Relative selection weight. Absent means 0, which disables the node.
    #[serde(default)]
    pub weight: u32,

    /// Probe verb, HEAD or GET.
    #[serde(default = "default_method")]
    pub method: String,
}

impl NodeConfig {
    pub fn new(server: impl Into<String>, ping: impl Into<String>, weight: u32) -> Self {
        Self {
            server: server.into(),
            ping: ping.into(),
            weight,
            method: default_method(),
        }
    }

    /// Builder-style probe method override.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Full URL hit by the health prober.
    pub fn ping_url(&self) -> String {
        format!("{}{}", self.server, self.ping)
    }

    fn normalized(mut self) -> Self {
        let method = self.method.trim().to_uppercase();
        self.method = if method.is_empty() { default_method() } else { method };
        self
    }
}

impl fmt::Display for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{server:{}, ping:{}, weight:{}, method:{}}}",
            self.server, self.ping, self.weight, self.method
        )
    }
}

fn default_method() -> String {
    "HEAD".to_string()
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Pause between refresh cycles in seconds.
    pub refresh_secs: u64,

    /// Hard bound on a single probe in seconds.
    pub timeout_secs: u64,
}

impl HealthCheckConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 30,
            timeout_secs: 5,
        }
    }
}

/// Per-IP rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting on redirect routes.
    pub enabled: bool,

    /// Sustained requests per second per client.
    pub requests_per_second: u32,

    /// Bucket capacity.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            burst: 50,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
