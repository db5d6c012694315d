//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tiered_lb_tier_selected_total` (counter): picks by aggregate, tier, class
//! - `tiered_lb_no_host_total` (counter): NoHost outcomes by reason
//! - `tiered_lb_tier_excluded_total` (counter): exclusions by reason
//! - `tiered_lb_relinearize_total` (counter): table rebuilds
//! - `tiered_lb_linear_tiers` (gauge): tiers in the current table
//! - `tiered_lb_recursion_depth` (histogram): depth at which a pick resolved

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_tier_selected(aggregate: &str, tier: usize, class: &'static str) {
    counter!(
        "tiered_lb_tier_selected_total",
        "aggregate" => aggregate.to_string(),
        "tier" => tier.to_string(),
        "class" => class
    )
    .increment(1);
}

pub fn record_no_host(aggregate: &str, reason: &'static str) {
    counter!(
        "tiered_lb_no_host_total",
        "aggregate" => aggregate.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_tier_excluded(reason: &'static str) {
    counter!("tiered_lb_tier_excluded_total", "reason" => reason).increment(1);
}

pub fn record_relinearize(aggregate: &str, tiers: usize) {
    counter!("tiered_lb_relinearize_total", "aggregate" => aggregate.to_string()).increment(1);
    gauge!("tiered_lb_linear_tiers", "aggregate" => aggregate.to_string()).set(tiers as f64);
}

pub fn record_recursion_depth(aggregate: &str, depth: u32) {
    histogram!("tiered_lb_recursion_depth", "aggregate" => aggregate.to_string()).record(f64::from(depth));
}
