//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem found, not just the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;
use crate::health::probe::ProbeMethod;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no services configured")]
    NoServices,

    #[error("service {0} has no nodes")]
    EmptyService(String),

    #[error("service {service}: invalid server url {server:?}")]
    InvalidServer { service: String, server: String },

    #[error("service {service}: node {server} has unsupported method {method}")]
    UnsupportedMethod {
        service: String,
        server: String,
        method: String,
    },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("invalid failback url {0:?}")]
    InvalidFailback(String),

    #[error("invalid stats url {0:?}")]
    InvalidStatsUrl(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting all errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.server.bind_address.clone()));
    }
    let metrics = &config.observability;
    if metrics.metrics_enabled && metrics.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(metrics.metrics_address.clone()));
    }

    if config.health_check.refresh_secs == 0 {
        errors.push(ValidationError::NotPositive("health_check.refresh_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::NotPositive("health_check.timeout_secs"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::NotPositive("rate_limit.requests_per_second"));
        }
        if config.rate_limit.burst == 0 {
            errors.push(ValidationError::NotPositive("rate_limit.burst"));
        }
    }

    if let Some(failback) = config.failback() {
        if !is_http_url(failback) {
            errors.push(ValidationError::InvalidFailback(failback.to_string()));
        }
    }
    if let Some(stats) = config.stats_url() {
        if !is_http_url(stats) {
            errors.push(ValidationError::InvalidStatsUrl(stats.to_string()));
        }
    }

    let services = config.node_map();
    if services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    for (service, nodes) in &services {
        if nodes.is_empty() {
            errors.push(ValidationError::EmptyService(service.clone()));
        }
        for node in nodes {
            if !is_http_url(&node.server) {
                errors.push(ValidationError::InvalidServer {
                    service: service.clone(),
                    server: node.server.clone(),
                });
            }
            if node.method.parse::<ProbeMethod>().is_err() {
                errors.push(ValidationError::UnsupportedMethod {
                    service: service.clone(),
                    server: node.server.clone(),
                    method: node.method.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::NodeConfig;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.services.insert(
            "svc".into(),
            vec![NodeConfig::new("http://n1.example.com", "/ping", 1)],
        );
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.health_check.refresh_secs = 0;
        config.server.failback = Some("not a url".into());
        config.services.insert(
            "bad".into(),
            vec![NodeConfig::new("n2.example.com", "/ping", 1).with_method("POST")],
        );
        config.services.insert("empty".into(), vec![]);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::NotPositive("health_check.refresh_secs")));
        assert!(errors.contains(&ValidationError::InvalidFailback("not a url".into())));
        assert!(errors.contains(&ValidationError::EmptyService("empty".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidServer { .. })));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::UnsupportedMethod { method, .. } if method == "POST"
        )));
    }

    #[test]
    fn test_no_services() {
        let errors = validate_config(&AppConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoServices]);
    }

    #[test]
    fn test_metrics_address_checked_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "localhost".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("localhost".into())])
        );

        config.observability.metrics_address = "127.0.0.1:9090".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_lowercase_method_accepted() {
        let mut config = valid_config();
        config.services.insert(
            "svc2".into(),
            vec![NodeConfig::new("https://n3.example.com", "/", 2).with_method("get")],
        );
        assert!(validate_config(&config).is_ok());
    }
}
