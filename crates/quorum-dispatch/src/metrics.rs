// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use quorum_core::ComplexityTier;

/// Register all Quorum metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("quorum_requests_total", "Total completion requests by tier");
    describe_counter!(
        "quorum_fallbacks_total",
        "Requests served by a fallback backend"
    );
    describe_counter!(
        "quorum_consensus_merges_total",
        "Consensus responses merged from multiple answers"
    );
    describe_histogram!("quorum_request_cost_usd", "Actual cost per request in USD");
    describe_histogram!(
        "quorum_request_latency_seconds",
        "End-to-end request latency in seconds"
    );
    describe_gauge!(
        "quorum_budget_spent_usd",
        "Committed spend in the current billing period"
    );
}

/// Record one inbound request.
pub fn record_request(tier: ComplexityTier) {
    metrics::counter!("quorum_requests_total", "tier" => tier.to_string()).increment(1);
}

/// Record a request that needed at least one fallback attempt.
pub fn record_fallback(backend: &str) {
    metrics::counter!("quorum_fallbacks_total", "backend" => backend.to_string()).increment(1);
}

/// Record a merged consensus response.
pub fn record_consensus_merge() {
    metrics::counter!("quorum_consensus_merges_total").increment(1);
}

/// Record the actual cost of a completed request.
pub fn record_cost(usd: f64) {
    metrics::histogram!("quorum_request_cost_usd").record(usd);
}

/// Record end-to-end latency of a completed request.
pub fn record_latency(elapsed: Duration) {
    metrics::histogram!("quorum_request_latency_seconds").record(elapsed.as_secs_f64());
}

/// Update the period-spend gauge.
pub fn set_budget_spent(usd: f64) {
    metrics::gauge!("quorum_budget_spent_usd").set(usd);
}
