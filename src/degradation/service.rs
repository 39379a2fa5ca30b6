//! Graceful degradation execution wrapper.
//!
//! The single entry point application code calls instead of invoking a
//! dependency directly: breaker consultation, timeout, retry, fallback
//! substitution, and per-service health bookkeeping.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

use super::fallback::{ExecuteOptions, Fallback};
use super::state::{overall_status, Bucket, ServiceHealth, ServiceStatus};
use crate::config::{DegradationSettings, ResilienceConfig};
use crate::error::ResilienceError;
use crate::events::{EventBus, HealthEvent};
use crate::observability::metrics;
use crate::resilience::backoff::RetrySchedule;
use crate::resilience::{BreakerSummary, CircuitBreakerRegistry, CircuitState};

/// Service name used by [`GracefulDegradationService::execute_database`].
pub const DATABASE: &str = "database";
/// Service name used by [`GracefulDegradationService::execute_redis`].
pub const REDIS: &str = "redis";

/// Degradation-side view of system health.
#[derive(Debug, Clone, Serialize)]
pub struct DegradationHealthView {
    pub overall: ServiceStatus,
    pub services: Vec<ServiceHealth>,
    pub breakers: BreakerSummary,
}

/// Executes operations against unreliable dependencies with fallback
/// semantics. Owns the per-service health buckets; reads breaker state
/// through the registry but never mutates breaker internals.
pub struct GracefulDegradationService {
    registry: Arc<CircuitBreakerRegistry>,
    settings: DegradationSettings,
    buckets: DashMap<String, Arc<Mutex<Bucket>>>,
    fallbacks: DashMap<String, Fallback<Value>>,
    timeouts: HashMap<String, Duration>,
    criticals: HashMap<String, bool>,
    events: EventBus,
}

impl GracefulDegradationService {
    pub fn new(
        registry: Arc<CircuitBreakerRegistry>,
        settings: DegradationSettings,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            settings,
            buckets: DashMap::new(),
            fallbacks: DashMap::new(),
            timeouts: HashMap::new(),
            criticals: HashMap::new(),
            events,
        }
    }

    /// Build from configuration, seeding a bucket per tracked service so
    /// the health view lists configured services before any traffic.
    pub fn from_config(
        config: &ResilienceConfig,
        registry: Arc<CircuitBreakerRegistry>,
        events: EventBus,
    ) -> Self {
        let mut service = Self::new(registry, config.degradation.clone(), events);
        for entry in &config.services {
            service.criticals.insert(entry.name.clone(), entry.critical);
            if let Some(timeout_ms) = entry.timeout_ms {
                service
                    .timeouts
                    .insert(entry.name.clone(), Duration::from_millis(timeout_ms));
            }
        }
        for entry in &config.services {
            service.bucket(&entry.name);
        }
        service
    }

    /// Execute `op` against `service` with breaker consultation, timeout,
    /// retry, and fallback semantics.
    ///
    /// Returns the operation result, the fallback result, or the original
    /// error when no fallback is usable.
    pub async fn execute<T, F, Fut>(
        &self,
        service: &str,
        op: F,
        options: ExecuteOptions<T>,
    ) -> Result<T, ResilienceError>
    where
        T: Clone,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let started = Instant::now();
        let timeout = options
            .timeout
            .or_else(|| self.timeouts.get(service).copied())
            .unwrap_or(Duration::from_millis(self.settings.default_timeout_ms));
        let max_retries = options.max_retries.unwrap_or(self.settings.max_retries);
        let mut schedule = RetrySchedule::new(
            max_retries,
            self.settings.retry_base_delay_ms,
            self.settings.retry_max_delay_ms,
        );

        let result = loop {
            let attempt = self
                .registry
                .call(service, || {
                    let fut = op();
                    async move {
                        match tokio::time::timeout(timeout, fut).await {
                            Ok(result) => result,
                            Err(_) => Err(ResilienceError::Timeout(timeout)),
                        }
                    }
                })
                .await;

            match attempt {
                Ok(value) => break Ok(value),
                // An open circuit is not retried; the breaker already
                // decided the dependency should be left alone.
                Err(e) if e.is_circuit_open() => break Err(e),
                Err(e) => match schedule.next_delay() {
                    Some(delay) => {
                        tracing::debug!(
                            service = %service,
                            attempt = schedule.attempts_made(),
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Operation failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => break Err(e),
                },
            }
        };

        match result {
            Ok(value) => {
                metrics::record_operation(service, "success", started);
                self.record_success(service);
                Ok(value)
            }
            Err(error) => {
                metrics::record_operation(service, error.kind(), started);
                match &options.fallback {
                    Some(fallback) => match fallback.resolve().await {
                        Ok(substitute) => {
                            metrics::record_fallback(service);
                            tracing::warn!(
                                service = %service,
                                error = %error,
                                "Operation failed, serving fallback"
                            );
                            self.record_failure(service, true);
                            Ok(substitute)
                        }
                        Err(fallback_error) => {
                            tracing::error!(
                                service = %service,
                                error = %error,
                                fallback_error = %fallback_error,
                                "Operation and fallback both failed"
                            );
                            self.record_failure(service, false);
                            Err(error)
                        }
                    },
                    None => {
                        self.record_failure(service, false);
                        Err(error)
                    }
                }
            }
        }
    }

    /// Convenience wrapper for the database dependency, consulting the
    /// per-service configured fallback.
    pub async fn execute_database<F, Fut>(&self, op: F) -> Result<Value, ResilienceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, ResilienceError>>,
    {
        self.execute_with_configured_fallback(DATABASE, op).await
    }

    /// Convenience wrapper for the cache dependency, consulting the
    /// per-service configured fallback.
    pub async fn execute_redis<F, Fut>(&self, op: F) -> Result<Value, ResilienceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, ResilienceError>>,
    {
        self.execute_with_configured_fallback(REDIS, op).await
    }

    async fn execute_with_configured_fallback<F, Fut>(
        &self,
        service: &str,
        op: F,
    ) -> Result<Value, ResilienceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, ResilienceError>>,
    {
        let mut options = ExecuteOptions::default();
        if let Some(fallback) = self.fallbacks.get(service) {
            options.fallback = Some(fallback.clone());
        }
        self.execute(service, op, options).await
    }

    /// Register a standing fallback for the named service, used by the
    /// convenience wrappers when the call site supplies none.
    pub fn configure_fallback(&self, service: &str, fallback: Fallback<Value>) {
        self.fallbacks.insert(service.to_string(), fallback);
    }

    /// Administrative override for maintenance windows and tests. Resets
    /// the bucket's counters so the forced state sticks until traffic or
    /// another override moves it.
    pub fn set_service_state(&self, service: &str, status: ServiceStatus) {
        let bucket = self.bucket(service);
        let previous = {
            let mut guard = bucket.lock().expect("health bucket mutex poisoned");
            guard.consecutive_successes = 0;
            guard.consecutive_failures = 0;
            guard.window.clear();
            guard.transition(status)
        };
        if let Some(previous) = previous {
            tracing::info!(
                service = %service,
                previous = previous.as_str(),
                current = status.as_str(),
                "Service state overridden"
            );
            metrics::record_state_change(service, previous, status);
            self.events
                .emit(HealthEvent::state_changed(service, previous, status));
        }
    }

    pub fn service_status(&self, service: &str) -> Option<ServiceStatus> {
        self.buckets.get(service).map(|bucket| {
            bucket
                .lock()
                .expect("health bucket mutex poisoned")
                .status
        })
    }

    /// Whether the named service counts as critical for aggregation.
    pub fn is_critical(&self, service: &str) -> bool {
        self.criticals.get(service).copied().unwrap_or(true)
    }

    /// Per-service views, ordered by service name.
    pub fn service_views(&self) -> Vec<ServiceHealth> {
        let mut views: Vec<ServiceHealth> = self
            .buckets
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .lock()
                    .expect("health bucket mutex poisoned")
                    .view(entry.key())
            })
            .collect();
        views.sort_by(|a, b| a.service.cmp(&b.service));
        views
    }

    /// Aggregate view: overall classification, per-service list, breaker
    /// summary.
    pub fn system_health(&self) -> DegradationHealthView {
        let services = self.service_views();
        let overall = overall_status(
            services
                .iter()
                .map(|view| (view.status, view.critical)),
        );
        DegradationHealthView {
            overall,
            services,
            breakers: self.registry.health_summary(),
        }
    }

    /// Receiver for health events (state changes, breaches, recoveries).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<HealthEvent> {
        self.events.subscribe()
    }

    fn bucket(&self, service: &str) -> Arc<Mutex<Bucket>> {
        if let Some(existing) = self.buckets.get(service) {
            return existing.clone();
        }
        let critical = self.is_critical(service);
        self.buckets
            .entry(service.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Bucket::new(critical, self.settings.health_window)))
            })
            .clone()
    }

    fn record_success(&self, service: &str) {
        let bucket = self.bucket(service);
        let (transition, recovered, availability) = {
            let mut guard = bucket.lock().expect("health bucket mutex poisoned");
            guard.record(true);
            let mut transition = None;
            let mut recovered = false;
            if guard.status != ServiceStatus::Healthy
                && guard.consecutive_successes >= self.settings.recovery_threshold
                && guard.window_clean()
                && !self.breaker_open(service)
            {
                transition = guard.transition(ServiceStatus::Healthy);
                recovered = transition.is_some();
            }
            (transition, recovered, guard.availability_ratio())
        };
        metrics::record_availability(service, availability);
        if let Some(previous) = transition {
            tracing::info!(
                service = %service,
                previous = previous.as_str(),
                "Service recovered"
            );
            metrics::record_state_change(service, previous, ServiceStatus::Healthy);
            self.events.emit(HealthEvent::state_changed(
                service,
                previous,
                ServiceStatus::Healthy,
            ));
        }
        if recovered {
            self.events.emit(HealthEvent::recovery_completed(service));
        }
    }

    fn record_failure(&self, service: &str, fallback_worked: bool) {
        let target = if fallback_worked {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Unavailable
        };
        let bucket = self.bucket(service);
        let (transition, availability) = {
            let mut guard = bucket.lock().expect("health bucket mutex poisoned");
            guard.record(false);
            (guard.transition(target), guard.availability_ratio())
        };
        metrics::record_availability(service, availability);
        if let Some(previous) = transition {
            tracing::warn!(
                service = %service,
                previous = previous.as_str(),
                current = target.as_str(),
                "Service health degraded"
            );
            metrics::record_state_change(service, previous, target);
            self.events
                .emit(HealthEvent::state_changed(service, previous, target));
        }
    }

    fn breaker_open(&self, service: &str) -> bool {
        matches!(
            self.registry.status(service).map(|status| status.state),
            Some(CircuitState::Open)
        )
    }
}
