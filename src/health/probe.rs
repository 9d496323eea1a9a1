//! Single-shot HTTP liveness probe.
//!
//! # Responsibilities
//! - Issue exactly one HEAD or GET against a node
//! - Bound the whole exchange (connect + response) by a timeout
//! - Classify the outcome: status >= 400, transport errors and timeouts fail
//!
//! # Design Decisions
//! - Redirects are not followed; a 3xx counts as alive
//! - Unknown verbs are refused before any network activity
//! - The response is dropped unread so the connection is always released

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use reqwest::{redirect, Client};
use thiserror::Error;
use tokio::time;

use crate::observability::metrics;

/// Probe verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    Get,
}

impl FromStr for ProbeMethod {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("HEAD") {
            Ok(ProbeMethod::Head)
        } else if s.eq_ignore_ascii_case("GET") {
            Ok(ProbeMethod::Get)
        } else {
            Err(ProbeError::UnsupportedMethod(s.to_string()))
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::Head => f.write_str("HEAD"),
            ProbeMethod::Get => f.write_str("GET"),
        }
    }
}

/// Why a probe did not pass.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("refused to probe, unknown method {0}")]
    UnsupportedMethod(String),

    #[error("probe of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("failed to hit {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad status code {status} for {url}")]
    BadStatus { url: String, status: u16 },
}

/// Shared HTTP client for liveness checks.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    timeout: Duration,
}

impl Prober {
    /// Build a prober whose every request is capped at `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(concat!("redirect-balancer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `url` with a verb given as configuration text.
    pub async fn probe(&self, url: &str, method: &str) -> Result<(), ProbeError> {
        let method: ProbeMethod = method.parse()?;
        self.check(url, method).await
    }

    /// Probe `url` with an already validated verb.
    pub async fn check(&self, url: &str, method: ProbeMethod) -> Result<(), ProbeError> {
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url),
        };

        let started = Instant::now();
        let outcome = time::timeout(self.timeout, request.timeout(self.timeout).send()).await;
        metrics::record_probe(method, started.elapsed());

        let response = match outcome {
            Err(_) => return Err(self.timed_out(url)),
            Ok(Err(e)) if e.is_timeout() => return Err(self.timed_out(url)),
            Ok(Err(e)) => {
                return Err(ProbeError::Transport {
                    url: url.to_string(),
                    source: e,
                })
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status().as_u16();
        drop(response);

        if status >= 400 {
            return Err(ProbeError::BadStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(())
    }

    fn timed_out(&self, url: &str) -> ProbeError {
        ProbeError::Timeout {
            url: url.to_string(),
            timeout: self.timeout,
        }
    }
}
