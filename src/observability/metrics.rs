//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, cache, rate limiting, errors)
//! - Render the Prometheus text format for `GET /metrics`
//!
//! # Metrics
//! - `gateway_requests_total` (counter): total requests by status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_cache_hits_total` / `gateway_cache_misses_total` (counters)
//! - `gateway_rate_limited_total` (counter): 429s by route
//! - `gateway_backend_errors_total` (counter): proxy failures by kind
//! - `gateway_config_reloads_total` (counter): reloads by outcome
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - One recorder per process; later callers share the installed handle

use std::sync::OnceLock;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder (idempotent) and return its handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                describe();
                handle
            }
            Err(e) => {
                // Another recorder is already global (e.g. in tests); keep a detached one.
                tracing::warn!(error = %e, "Prometheus recorder not installed globally");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

/// Render all metrics in the Prometheus text exposition format.
pub fn render() -> String {
    init_metrics().render()
}

/// Drain histograms; call periodically.
pub fn run_upkeep() {
    if let Some(handle) = HANDLE.get() {
        handle.run_upkeep();
    }
}

fn describe() {
    metrics::describe_counter!("gateway_requests_total", "Requests answered, by status");
    metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        metrics::Unit::Seconds,
        "Time from dispatch to response headers"
    );
    metrics::describe_counter!("gateway_cache_hits_total", "Responses served from cache");
    metrics::describe_counter!("gateway_cache_misses_total", "Cacheable requests not in cache");
    metrics::describe_counter!("gateway_rate_limited_total", "Requests rejected with 429");
    metrics::describe_counter!("gateway_backend_errors_total", "Failed backend calls");
    metrics::describe_counter!("gateway_config_reloads_total", "Configuration reload attempts");
}

/// Record a completed request.
pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_hit() {
    metrics::counter!("gateway_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("gateway_cache_misses_total").increment(1);
}

pub fn record_rate_limited(route: &str) {
    metrics::counter!("gateway_rate_limited_total", "route" => route.to_string()).increment(1);
}

/// Record a backend failure; `kind` is "uri", "connect", "upstream" or "timeout".
pub fn record_backend_error(kind: &'static str) {
    metrics::counter!("gateway_backend_errors_total", "kind" => kind).increment(1);
}

/// Record a reload attempt; `outcome` is "success" or "failure".
pub fn record_reload(outcome: &'static str) {
    metrics::counter!("gateway_config_reloads_total", "outcome" => outcome).increment(1);
}
