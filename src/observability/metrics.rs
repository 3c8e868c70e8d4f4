//! Metrics collection and exposition.
//!
//! # Metrics
//! - `locale_requests_total` (counter): handled requests by resolved locale
//! - `rewrite_decisions_total` (counter): pipeline outcome by decision
//! - `render_calls_total` (counter): render service calls by outcome
//! - `page_cache_lookups_total` (counter): cache lookups by result
//! - `metadata_refresh_total` (counter): metadata fetches by outcome
//! - `render_service_healthy` (gauge): 1=healthy, 0=unhealthy

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_locale(locale: &str) {
    let label = if locale.is_empty() { "none" } else { locale };
    metrics::counter!("locale_requests_total", "locale" => label.to_string()).increment(1);
}

pub fn record_rewrite_decision(decision: &'static str) {
    metrics::counter!("rewrite_decisions_total", "decision" => decision).increment(1);
}

pub fn record_render_call(outcome: &'static str) {
    metrics::counter!("render_calls_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("page_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_metadata_refresh(outcome: &'static str) {
    metrics::counter!("metadata_refresh_total", "outcome" => outcome).increment(1);
}

pub fn set_render_healthy(healthy: bool) {
    metrics::gauge!("render_service_healthy").set(if healthy { 1.0 } else { 0.0 });
}
