//! Per-client rate limiting middleware.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Allowances idle this long are full again and can be forgotten.
const IDLE_EVICTION: Duration = Duration::from_secs(60);
const PRUNE_THRESHOLD: usize = 10_000;

/// Bucket size and refill speed shared by every client.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Quota {
    burst: f64,
    per_second: f64,
}

impl From<&RateLimitConfig> for Quota {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            burst: f64::from(config.burst),
            per_second: f64::from(config.requests_per_second),
        }
    }
}

/// Tokens left for one client; starts full.
#[derive(Debug, Clone, Copy)]
struct Allowance {
    tokens: f64,
    refreshed: Instant,
}

impl Allowance {
    fn full(quota: Quota, now: Instant) -> Self {
        Self {
            tokens: quota.burst,
            refreshed: now,
        }
    }

    fn take(&mut self, quota: Quota, now: Instant) -> bool {
        let idle = now.saturating_duration_since(self.refreshed).as_secs_f64();
        self.tokens = quota.burst.min(self.tokens + idle * quota.per_second);
        self.refreshed = now;

        let granted = self.tokens >= 1.0;
        if granted {
            self.tokens -= 1.0;
        }
        granted
    }
}

/// Allowances keyed by client IP.
pub struct RateLimiterState {
    clients: Mutex<HashMap<IpAddr, Allowance>>,
    quota: Quota,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            quota: Quota::from(config),
        }
    }

    /// Take one token for `ip`, false when its allowance is spent.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        if clients.len() > PRUNE_THRESHOLD {
            clients.retain(|_, a| now.saturating_duration_since(a.refreshed) < IDLE_EVICTION);
        }

        clients
            .entry(ip)
            .or_insert_with(|| Allowance::full(self.quota, now))
            .take(self.quota, now)
    }
}

/// Middleware function for per-IP rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.check(addr.ip()) {
        return next.run(request).await;
    }

    tracing::warn!(client = %addr.ip(), path = %request.uri().path(), "Rate limit exceeded");
    metrics::record_rate_limited();
    (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
}
