//! Metrics collector for the forwarding engine
//!
//! Handles are resolved against the global `metrics` recorder when the
//! collector is created; without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

pub struct MetricsCollector {
    requests_admitted_total: Counter,
    requests_rejected_total: Counter,
    dispatches_total: Counter,
    dispatch_failures_total: Counter,
    dispatch_duration: Histogram,
    inflight_dispatches: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_admitted_total: counter!("balancer_requests_admitted_total"),
            requests_rejected_total: counter!("balancer_requests_rejected_total"),
            dispatches_total: counter!("balancer_dispatches_total"),
            dispatch_failures_total: counter!("balancer_dispatch_failures_total"),
            dispatch_duration: histogram!("balancer_dispatch_duration_seconds"),
            inflight_dispatches: gauge!("balancer_inflight_dispatches"),
        }
    }

    /// Record a request accepted into a route queue
    pub fn record_admitted(&self, route: &str) {
        self.requests_admitted_total.increment(1);
        counter!("balancer_route_admitted_total", "route" => route.to_string()).increment(1);
    }

    /// Record a rejected submission
    pub fn record_rejected(&self, reason: &'static str) {
        self.requests_rejected_total.increment(1);
        counter!("balancer_route_rejected_total", "reason" => reason).increment(1);
    }

    pub fn record_dispatch(&self, route: &str, duration_seconds: f64) {
        self.dispatches_total.increment(1);
        self.dispatch_duration.record(duration_seconds);
        counter!("balancer_route_dispatches_total", "route" => route.to_string()).increment(1);
    }

    pub fn record_dispatch_failure(&self, route: &str, kind: &'static str) {
        self.dispatch_failures_total.increment(1);
        counter!(
            "balancer_route_dispatch_failures_total",
            "route" => route.to_string(),
            "kind" => kind
        )
        .increment(1);
    }

    pub fn update_inflight(&self, count: usize) {
        self.inflight_dispatches.set(count as f64);
    }

    pub fn update_queue_depth(&self, route: &str, depth: usize) {
        gauge!("balancer_queue_depth", "route" => route.to_string()).set(depth as f64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
