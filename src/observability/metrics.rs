//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resilience metrics (operation outcomes, fallbacks, breaker
//!   states, probe durations, availability)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `resilience_operations_total` (counter): operations by service, outcome
//! - `resilience_operation_duration_seconds` (histogram): wrapped-call latency
//! - `resilience_fallbacks_total` (counter): fallback substitutions by service
//! - `resilience_state_changes_total` (counter): bucket transitions by edge
//! - `resilience_service_availability_ratio` (gauge): per-service success ratio
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half_open
//! - `circuit_breaker_rejections_total` (counter): fail-fast rejections
//! - `health_check_duration_seconds` (histogram): per-probe latency
//! - `health_check_cycle_duration_seconds` (histogram): full-cycle latency
//! - `health_service_status` (gauge): 0=healthy, 1=degraded, 2=unavailable

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::degradation::state::ServiceStatus;
use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_counter!(
        "resilience_operations_total",
        "Wrapped operations by service and outcome"
    );
    describe_histogram!(
        "resilience_operation_duration_seconds",
        "Wrapped operation latency"
    );
    describe_counter!(
        "resilience_fallbacks_total",
        "Fallback substitutions by service"
    );
    describe_counter!(
        "resilience_state_changes_total",
        "Service health bucket transitions"
    );
    describe_gauge!(
        "resilience_service_availability_ratio",
        "Per-service success ratio over the process lifetime"
    );
    describe_gauge!(
        "circuit_breaker_state",
        "Breaker state: 0=closed, 1=open, 2=half_open"
    );
    describe_counter!(
        "circuit_breaker_rejections_total",
        "Calls rejected without execution by an open breaker"
    );
    describe_histogram!("health_check_duration_seconds", "Per-probe latency");
    describe_histogram!(
        "health_check_cycle_duration_seconds",
        "Full health-check cycle latency"
    );
    describe_gauge!(
        "health_service_status",
        "Reported status: 0=healthy, 1=degraded, 2=unavailable"
    );
}

pub fn record_operation(service: &str, outcome: &'static str, started: Instant) {
    counter!(
        "resilience_operations_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "resilience_operation_duration_seconds",
        "service" => service.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_fallback(service: &str) {
    counter!("resilience_fallbacks_total", "service" => service.to_string()).increment(1);
}

pub fn record_state_change(service: &str, from: ServiceStatus, to: ServiceStatus) {
    counter!(
        "resilience_state_changes_total",
        "service" => service.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_availability(service: &str, ratio: f64) {
    gauge!(
        "resilience_service_availability_ratio",
        "service" => service.to_string()
    )
    .set(ratio);
}

pub fn record_breaker_state(service: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!("circuit_breaker_state", "service" => service.to_string()).set(value);
}

pub fn record_breaker_rejection(service: &str) {
    counter!(
        "circuit_breaker_rejections_total",
        "service" => service.to_string()
    )
    .increment(1);
}

pub fn record_check(service: &str, status: ServiceStatus, duration: Duration) {
    histogram!(
        "health_check_duration_seconds",
        "service" => service.to_string()
    )
    .record(duration.as_secs_f64());
    let value = match status {
        ServiceStatus::Healthy => 0.0,
        ServiceStatus::Degraded => 1.0,
        ServiceStatus::Unavailable => 2.0,
    };
    gauge!("health_service_status", "service" => service.to_string()).set(value);
}

pub fn record_cycle(duration: Duration) {
    histogram!("health_check_cycle_duration_seconds").record(duration.as_secs_f64());
}
