//! Point-in-time health aggregates.
//!
//! Snapshots are immutable once constructed; the monitor publishes a
//! fresh one per cycle and readers never observe a partial update.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::degradation::state::{unix_now, ServiceStatus};
use crate::resilience::BreakerSummary;

/// One service's entry in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCheck {
    pub service: String,
    pub status: ServiceStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Opaque numeric gauges attached to a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceMetrics {
    pub uptime_seconds: u64,
    pub monitored_services: u64,
    pub last_cycle_ms: u64,
}

/// Immutable aggregate of all monitored services' status.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthSnapshot {
    pub overall: ServiceStatus,
    pub services: Vec<ServiceCheck>,
    pub breakers: BreakerSummary,
    pub resources: ResourceMetrics,
    pub timestamp: u64,
}

impl SystemHealthSnapshot {
    /// Initial snapshot published before the first cycle completes.
    pub fn empty() -> Self {
        Self {
            overall: ServiceStatus::Healthy,
            services: Vec::new(),
            breakers: BreakerSummary::default(),
            resources: ResourceMetrics::default(),
            timestamp: unix_now(),
        }
    }
}

/// Liveness answer: is the process running. Never consults dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

/// Readiness answer: should this process currently receive traffic.
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub timestamp: u64,
    pub dependencies: BTreeMap<String, bool>,
    pub services: Vec<ServiceCheck>,
}

/// Result of an on-demand forced re-evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ForcedCheck {
    pub forced: bool,
    pub timestamp: u64,
    pub overall: ServiceStatus,
    pub services: Vec<ServiceCheck>,
    pub duration_ms: u64,
}
