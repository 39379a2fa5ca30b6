//! Registry of named circuit breakers.
//!
//! # Responsibilities
//! - Lazily create one breaker per service name
//! - Wrap operations with breaker admission and outcome recording
//! - Expose per-breaker status and a fleet-wide summary
//!
//! # Design Decisions
//! - Breakers live for the process lifetime, never evicted
//! - Per-service settings override the registry defaults
//! - Outcomes are recorded in completion order under the breaker lock

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use super::circuit_breaker::{BreakerStatus, CircuitBreaker, CircuitState};
use crate::config::{BreakerSettings, ResilienceConfig};
use crate::error::ResilienceError;
use crate::events::{EventBus, HealthEvent};
use crate::observability::metrics;

/// Fleet-wide breaker summary. `failed` counts breakers currently holding
/// a nonzero consecutive-failure count.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BreakerSummary {
    pub total: usize,
    pub closed: usize,
    pub open: usize,
    pub half_open: usize,
    pub failed: usize,
}

/// Owns every circuit breaker, keyed by service name.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    defaults: BreakerSettings,
    overrides: HashMap<String, BreakerSettings>,
    events: EventBus,
}

impl CircuitBreakerRegistry {
    pub fn new(defaults: BreakerSettings, events: EventBus) -> Self {
        Self {
            breakers: DashMap::new(),
            defaults,
            overrides: HashMap::new(),
            events,
        }
    }

    /// Build from configuration: registry defaults plus per-service
    /// threshold/cooldown overrides.
    pub fn from_config(config: &ResilienceConfig, events: EventBus) -> Self {
        let mut overrides = HashMap::new();
        for service in &config.services {
            if let Some(settings) = service.breaker_overrides(&config.breaker) {
                overrides.insert(service.name.clone(), settings);
            }
        }
        Self {
            breakers: DashMap::new(),
            defaults: config.breaker.clone(),
            overrides,
            events,
        }
    }

    /// Get the breaker for `service`, creating it on first reference.
    pub fn get_or_create(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(service) {
            return existing.clone();
        }
        let settings = self
            .overrides
            .get(service)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone());
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, settings)))
            .clone()
    }

    /// Run `op` under the service's breaker. Fails fast with
    /// `CircuitOpen` while the breaker rejects calls; otherwise records
    /// the outcome and passes the result through.
    pub async fn call<T, F, Fut>(&self, service: &str, op: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let breaker = self.get_or_create(service);
        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(e) => {
                metrics::record_breaker_rejection(service);
                return Err(e);
            }
        };

        match op().await {
            Ok(value) => {
                if let Some(transition) = breaker.on_success(permit) {
                    tracing::info!(
                        service = %service,
                        from = transition.from.as_str(),
                        "Circuit breaker closed, dependency recovered"
                    );
                    metrics::record_breaker_state(service, transition.to);
                }
                Ok(value)
            }
            Err(e) => {
                if let Some(transition) = breaker.on_failure(permit) {
                    tracing::warn!(
                        service = %service,
                        from = transition.from.as_str(),
                        to = transition.to.as_str(),
                        cooldown_ms = breaker.settings().open_duration_ms,
                        "Circuit breaker opened, failing fast"
                    );
                    metrics::record_breaker_state(service, transition.to);
                    if transition.from == CircuitState::Closed {
                        let threshold = breaker.settings().failure_threshold;
                        self.events.emit(HealthEvent::threshold_breached(
                            service, threshold, threshold,
                        ));
                    }
                }
                Err(e)
            }
        }
    }

    /// Status of one breaker, if it has ever been referenced.
    pub fn status(&self, service: &str) -> Option<BreakerStatus> {
        self.breakers.get(service).map(|breaker| breaker.status())
    }

    /// Per-service status map for snapshot merging.
    pub fn statuses(&self) -> HashMap<String, BreakerStatus> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status()))
            .collect()
    }

    pub fn health_summary(&self) -> BreakerSummary {
        let mut summary = BreakerSummary::default();
        for entry in self.breakers.iter() {
            let status = entry.value().status();
            summary.total += 1;
            match status.state {
                CircuitState::Closed => summary.closed += 1,
                CircuitState::Open => summary.open += 1,
                CircuitState::HalfOpen => summary.half_open += 1,
            }
            if status.failure_count > 0 || status.state != CircuitState::Closed {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Reset one breaker, or every breaker when no name is given.
    pub fn reset(&self, service: Option<&str>) {
        match service {
            Some(name) => {
                if let Some(breaker) = self.breakers.get(name) {
                    breaker.reset();
                    tracing::info!(service = %name, "Circuit breaker reset");
                }
            }
            None => {
                for entry in self.breakers.iter() {
                    entry.value().reset();
                }
                tracing::info!("All circuit breakers reset");
            }
        }
    }
}
