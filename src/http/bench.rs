//! Rolling throughput and latency of the jump routes.
//!
//! Requests are folded into one bucket per second; buckets older than the
//! longest reported window are dropped on write.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::observability::metrics;

/// Longest window `stats` can answer for.
pub const MAX_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    second: u64,
    requests: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

/// Aggregates over one window. Times are in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BenchmarkStats {
    pub total_requests: u64,
    pub total_requests_sec: f64,
    pub average_resp_time: u64,
    pub min_resp_time: u64,
    pub max_resp_time: u64,
}

#[derive(Debug)]
pub struct Benchmarks {
    started: Instant,
    buckets: Mutex<VecDeque<Bucket>>,
}

impl Default for Benchmarks {
    fn default() -> Self {
        Self::new()
    }
}

impl Benchmarks {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            buckets: Mutex::new(VecDeque::new()),
        }
    }

    /// Account one finished request.
    pub fn record(&self, elapsed: Duration) {
        self.record_at(self.now(), elapsed);
    }

    /// Aggregates over the last `window` (clamped to [`MAX_WINDOW`]).
    pub fn stats(&self, window: Duration) -> BenchmarkStats {
        self.stats_at(self.now(), window)
    }

    fn now(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    fn record_at(&self, second: u64, elapsed: Duration) {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        match buckets.back_mut() {
            Some(last) if last.second == second => {
                last.requests += 1;
                last.total += elapsed;
                last.min = last.min.min(elapsed);
                last.max = last.max.max(elapsed);
            }
            _ => buckets.push_back(Bucket {
                second,
                requests: 1,
                total: elapsed,
                min: elapsed,
                max: elapsed,
            }),
        }

        let horizon = MAX_WINDOW.as_secs();
        while buckets.front().is_some_and(|b| b.second + horizon <= second) {
            buckets.pop_front();
        }
    }

    fn stats_at(&self, now: u64, window: Duration) -> BenchmarkStats {
        let window = window.min(MAX_WINDOW).as_secs().max(1);
        let buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        let mut requests = 0u64;
        let mut total = Duration::ZERO;
        let mut min: Option<Duration> = None;
        let mut max = Duration::ZERO;
        for bucket in buckets.iter().filter(|b| b.second + window > now) {
            requests += bucket.requests;
            total += bucket.total;
            min = Some(min.map_or(bucket.min, |m| m.min(bucket.min)));
            max = max.max(bucket.max);
        }

        if requests == 0 {
            return BenchmarkStats::default();
        }

        // A process younger than the window has only been up for `now + 1` seconds.
        let span = window.min(now + 1);
        BenchmarkStats {
            total_requests: requests,
            total_requests_sec: requests as f64 / span as f64,
            average_resp_time: micros(total) / requests,
            min_resp_time: min.map_or(0, micros),
            max_resp_time: micros(max),
        }
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Time every request of the wrapped routes.
pub async fn bench_middleware(
    State(bench): State<Arc<Benchmarks>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();

    bench.record(elapsed);
    metrics::record_jump_duration(elapsed);
    response
}
