//! Health event bus.
//!
//! # Delivery Semantics
//! - At-most-once: lagging subscribers lose events, emitters never block
//! - Emit never fails the caller; a bus with no subscribers is fine
//! - Maintenance mode mutes delivery to sinks; events are still logged

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;

use crate::degradation::state::{unix_now, ServiceStatus};

/// A state-change, threshold-breach, or recovery notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    StateChanged {
        service: String,
        previous: ServiceStatus,
        current: ServiceStatus,
        timestamp: u64,
    },
    ThresholdBreached {
        service: String,
        failure_count: u32,
        threshold: u32,
        timestamp: u64,
    },
    RecoveryCompleted {
        service: String,
        timestamp: u64,
    },
}

impl HealthEvent {
    pub fn state_changed(service: &str, previous: ServiceStatus, current: ServiceStatus) -> Self {
        HealthEvent::StateChanged {
            service: service.to_string(),
            previous,
            current,
            timestamp: unix_now(),
        }
    }

    pub fn threshold_breached(service: &str, failure_count: u32, threshold: u32) -> Self {
        HealthEvent::ThresholdBreached {
            service: service.to_string(),
            failure_count,
            threshold,
            timestamp: unix_now(),
        }
    }

    pub fn recovery_completed(service: &str) -> Self {
        HealthEvent::RecoveryCompleted {
            service: service.to_string(),
            timestamp: unix_now(),
        }
    }

    /// Dotted event name as published to external consumers.
    pub fn name(&self) -> &'static str {
        match self {
            HealthEvent::StateChanged { .. } => "health.state.changed",
            HealthEvent::ThresholdBreached { .. } => "health.threshold.breached",
            HealthEvent::RecoveryCompleted { .. } => "health.recovery.completed",
        }
    }

    pub fn service(&self) -> &str {
        match self {
            HealthEvent::StateChanged { service, .. }
            | HealthEvent::ThresholdBreached { service, .. }
            | HealthEvent::RecoveryCompleted { service, .. } => service,
        }
    }

    /// Wire shape for webhook delivery.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            HealthEvent::StateChanged {
                service,
                previous,
                current,
                timestamp,
            } => json!({
                "event": self.name(),
                "service": service,
                "previous": previous,
                "current": current,
                "timestamp": timestamp,
            }),
            HealthEvent::ThresholdBreached {
                service,
                failure_count,
                threshold,
                timestamp,
            } => json!({
                "event": self.name(),
                "service": service,
                "failure_count": failure_count,
                "threshold": threshold,
                "timestamp": timestamp,
            }),
            HealthEvent::RecoveryCompleted { service, timestamp } => json!({
                "event": self.name(),
                "service": service,
                "timestamp": timestamp,
            }),
        }
    }
}

/// Broadcast fan-out for health events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HealthEvent>,
    muted: Arc<AtomicBool>,
}

impl EventBus {
    /// Create a bus with the given subscriber buffer. The `muted` flag is
    /// shared with whatever owns the maintenance-mode toggle.
    pub fn new(buffer: usize, muted: Arc<AtomicBool>) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx, muted }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Never blocks, never fails the caller.
    pub fn emit(&self, event: HealthEvent) {
        tracing::info!(
            event = event.name(),
            service = event.service(),
            muted = self.is_muted(),
            "Health event"
        );
        if self.is_muted() {
            return;
        }
        let _ = self.tx.send(event);
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
