//! Per-service health buckets.
//!
//! # States
//! - Healthy: recent operations clean, breaker not open
//! - Degraded: operations failing but a fallback is carrying the load
//! - Unavailable: operations failing with no usable fallback
//!
//! # State Transitions
//! ```text
//! Healthy → Degraded: operation failed, fallback succeeded
//! Healthy → Unavailable: operation failed, no fallback (or fallback failed)
//! Degraded ↔ Unavailable: driven by fallback viability per failure
//! any → Healthy: recovery_threshold consecutive successes, clean window,
//!                breaker not open
//! ```
//!
//! # Design Decisions
//! - Buckets are owned exclusively by the degradation service
//! - Recovery requires hysteresis to prevent flapping
//! - Counters reset on state transition

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Three-state health classification, shared by the degradation view and
/// the monitor snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unavailable,
}

impl ServiceStatus {
    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Unavailable => "unavailable",
        }
    }

    /// The more severe of two statuses.
    pub fn worst(self, other: ServiceStatus) -> ServiceStatus {
        self.max(other)
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate an overall status from per-service `(status, critical)` pairs.
///
/// Unavailable iff any critical service is unavailable; a non-critical
/// unavailable service only degrades the overall status; degraded iff any
/// service is degraded; healthy otherwise.
pub fn overall_status<I>(services: I) -> ServiceStatus
where
    I: IntoIterator<Item = (ServiceStatus, bool)>,
{
    let mut overall = ServiceStatus::Healthy;
    for (status, critical) in services {
        let effective = match (status, critical) {
            (ServiceStatus::Unavailable, false) => ServiceStatus::Degraded,
            (status, _) => status,
        };
        overall = overall.worst(effective);
    }
    overall
}

/// Point-in-time view of one service's bucket.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub service: String,
    pub status: ServiceStatus,
    pub critical: bool,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    /// Unix timestamp of the last status transition.
    pub last_transition: u64,
}

/// Mutable bucket state, guarded by a per-service mutex in the service map.
#[derive(Debug)]
pub(crate) struct Bucket {
    pub status: ServiceStatus,
    pub critical: bool,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    /// Recent operation outcomes, newest last. `true` is a success.
    pub window: VecDeque<bool>,
    pub window_size: usize,
    pub total_operations: u64,
    pub total_successes: u64,
    pub last_transition: u64,
}

impl Bucket {
    pub fn new(critical: bool, window_size: usize) -> Self {
        Self {
            status: ServiceStatus::Healthy,
            critical,
            consecutive_successes: 0,
            consecutive_failures: 0,
            window: VecDeque::with_capacity(window_size),
            window_size,
            total_operations: 0,
            total_successes: 0,
            last_transition: unix_now(),
        }
    }

    pub fn record(&mut self, success: bool) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(success);
        self.total_operations += 1;
        if success {
            self.total_successes += 1;
            self.consecutive_successes += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            self.consecutive_successes = 0;
        }
    }

    /// No failures among the recorded recent operations.
    pub fn window_clean(&self) -> bool {
        self.window.iter().all(|ok| *ok)
    }

    pub fn availability_ratio(&self) -> f64 {
        if self.total_operations == 0 {
            return 1.0;
        }
        self.total_successes as f64 / self.total_operations as f64
    }

    /// Move to `status`, returning the previous status if it changed.
    pub fn transition(&mut self, status: ServiceStatus) -> Option<ServiceStatus> {
        if self.status == status {
            return None;
        }
        let previous = self.status;
        self.status = status;
        self.last_transition = unix_now();
        Some(previous)
    }

    pub fn view(&self, service: &str) -> ServiceHealth {
        ServiceHealth {
            service: service.to_string(),
            status: self.status,
            critical: self.critical,
            consecutive_successes: self.consecutive_successes,
            consecutive_failures: self.consecutive_failures,
            last_transition: self.last_transition,
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
