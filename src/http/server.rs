//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, throttling, headers)
//! - Redirect jump requests to the node chosen by the picker
//! - Expose status, node diagnostics, benchmark and ping endpoints
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::bench::{bench_middleware, Benchmarks};
use crate::http::request::{client_ip, referer, JumpQuery, X_REQUEST_ID};
use crate::http::stats::{LogRecord, StatsSubmitter};
use crate::load_balancer::Picker;
use crate::observability::metrics;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_IN_FLIGHT: usize = 10_000;

/// Application state injected into handlers.
pub struct AppState<P> {
    pub picker: Arc<P>,
    pub no_node_message: Arc<str>,
    pub stats: Option<StatsSubmitter>,
    pub bench: Arc<Benchmarks>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            picker: self.picker.clone(),
            no_node_message: self.no_node_message.clone(),
            stats: self.stats.clone(),
            bench: self.bench.clone(),
        }
    }
}

/// HTTP front door of the redirector.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the server around a picker. Fails only if the stats client cannot be built.
    pub fn new<P: Picker>(picker: Arc<P>, config: &AppConfig) -> Result<Self, reqwest::Error> {
        let stats = config.stats_url().map(StatsSubmitter::new).transpose()?;

        let state = AppState {
            picker,
            no_node_message: Arc::from(config.server.no_node_message.as_str()),
            stats,
            bench: Arc::new(Benchmarks::new()),
        };

        let router = Self::build_router(config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<P: Picker>(config: &AppConfig, state: AppState<P>) -> Router {
        // `get` also answers HEAD.
        let mut jumps = Router::new()
            .route("/api/v1/jump/{svc}", get(jump::<P>))
            .route("/{svc}", get(jump::<P>))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(state.bench.clone(), bench_middleware));

        // Outside the timing layer: throttled requests are not benchmarked.
        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiterState::new(&config.rate_limit));
            jumps = jumps.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/ping", get(ping))
            .route("/api/v1/status", get(status::<P>))
            .route("/api/v1/nodes", get(nodes::<P>))
            .route("/api/v1/bench", get(benchmarks::<P>))
            .with_state(state)
            .merge(jumps)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(GlobalConcurrencyLimitLayer::new(MAX_IN_FLIGHT))
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                    .layer(SetResponseHeaderLayer::overriding(
                        header::CACHE_CONTROL,
                        HeaderValue::from_static("no-cache, no-store, must-revalidate, max-age=0"),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        header::EXPIRES,
                        HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        HeaderName::from_static("app-name"),
                        HeaderValue::from_static("redirect-balancer"),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        HeaderName::from_static("app-version"),
                        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
                    )),
            )
    }

    /// The fully layered router, for embedding or tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Jump to an alive node of `svc`: `GET|HEAD /api/v1/jump/{svc}?url=<resource>`.
async fn jump<P: Picker>(
    State(state): State<AppState<P>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(svc): Path<String>,
    Query(query): Query<JumpQuery>,
    headers: HeaderMap,
) -> Response {
    tracing::debug!(service = %svc, url = %query.url, "Jump");

    let pick = match state.picker.pick(&svc, &query.url).await {
        Ok(pick) => pick,
        Err(e) => {
            tracing::debug!(service = %svc, error = %e, "No node to jump to");
            metrics::record_jump(&svc, "no_node");
            return (StatusCode::NOT_FOUND, Html(state.no_node_message.to_string())).into_response();
        }
    };

    tracing::debug!(server = %pick.node.server(), location = %pick.url, "Redirect");
    metrics::record_jump(&svc, "redirect");

    if let Some(stats) = &state.stats {
        let record = LogRecord::new(
            client_ip(&headers, peer),
            pick.node.server(),
            &format!("{}{}", svc, query.url),
            referer(&headers),
        );
        stats.spawn_submit(record);
    }

    (StatusCode::FOUND, [(header::LOCATION, pick.url)]).into_response()
}

/// `GET /api/v1/status`: 200 when every node is alive, 417 with the dead ones otherwise.
async fn status<P: Picker>(State(state): State<AppState<P>>) -> Response {
    let (ok, failed) = state.picker.status();
    if !ok {
        return (
            StatusCode::EXPECTATION_FAILED,
            Json(json!({ "status": "failed", "hosts": failed })),
        )
            .into_response();
    }
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

async fn nodes<P: Picker>(State(state): State<AppState<P>>) -> Response {
    Json(state.picker.nodes()).into_response()
}

/// `GET /api/v1/bench`: jump throughput and latency over 1, 5 and 15 minutes.
async fn benchmarks<P: Picker>(State(state): State<AppState<P>>) -> Response {
    let minute = Duration::from_secs(60);
    Json(json!({
        "1min": state.bench.stats(minute),
        "5min": state.bench.stats(5 * minute),
        "15min": state.bench.stats(15 * minute),
    }))
    .into_response()
}

async fn ping() -> &'static str {
    "pong"
}
