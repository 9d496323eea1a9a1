//! Request inspection helpers.
//!
//! # Responsibilities
//! - Parse the jump query (`?url=<resource>`)
//! - Resolve the real client IP behind a reverse proxy
//! - Read the referer for usage statistics

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap};
use serde::Deserialize;

/// Request ID header set and propagated by the middleware stack.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Query of a jump request.
#[derive(Debug, Default, Deserialize)]
pub struct JumpQuery {
    /// Resource path appended to the chosen server.
    #[serde(default)]
    pub url: String,
}

/// Client IP, preferring `X-Real-IP`, then the first `X-Forwarded-For` entry.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    };

    real_ip.or_else(forwarded).unwrap_or_else(|| peer.ip())
}

pub fn referer(headers: &HeaderMap) -> &str {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
