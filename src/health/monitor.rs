//! Periodic health monitoring and snapshot aggregation.
//!
//! # Responsibilities
//! - Run all registered probes concurrently on a timer
//! - Merge probe results with breaker states and degradation buckets
//! - Publish an atomic, immutable snapshot per cycle
//! - Serve liveness/readiness/forced-check views on demand

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use super::probe::{HealthProbe, HttpProbe};
use super::snapshot::{
    ForcedCheck, Liveness, Readiness, ResourceMetrics, ServiceCheck, SystemHealthSnapshot,
};
use crate::config::{MonitorConfig, ResilienceConfig};
use crate::degradation::state::{overall_status, unix_now, ServiceStatus};
use crate::degradation::GracefulDegradationService;
use crate::error::ResilienceError;
use crate::observability::metrics;
use crate::resilience::{CircuitBreakerRegistry, CircuitState};

/// Polls dependency health and aggregates the authoritative, conservative
/// system view: a service is never reported healthier than any of its
/// three information sources (probe, breaker, degradation bucket).
pub struct HealthMonitorService {
    probes: RwLock<Vec<Arc<dyn HealthProbe>>>,
    degradation: Arc<GracefulDegradationService>,
    registry: Arc<CircuitBreakerRegistry>,
    config: MonitorConfig,
    /// service → services it depends on
    dependencies: HashMap<String, Vec<String>>,
    criticals: HashMap<String, bool>,
    snapshot: ArcSwap<SystemHealthSnapshot>,
    started_at: Instant,
    maintenance: Arc<AtomicBool>,
    runner: Mutex<Option<(broadcast::Sender<()>, JoinHandle<()>)>>,
}

impl HealthMonitorService {
    pub fn new(
        config: MonitorConfig,
        degradation: Arc<GracefulDegradationService>,
        registry: Arc<CircuitBreakerRegistry>,
        maintenance: Arc<AtomicBool>,
    ) -> Self {
        Self {
            probes: RwLock::new(Vec::new()),
            degradation,
            registry,
            config,
            dependencies: HashMap::new(),
            criticals: HashMap::new(),
            snapshot: ArcSwap::from_pointee(SystemHealthSnapshot::empty()),
            started_at: Instant::now(),
            maintenance,
            runner: Mutex::new(None),
        }
    }

    /// Build from configuration: HTTP probes for services with a probe
    /// URL, plus dependency edges and critical flags.
    pub fn from_config(
        config: &ResilienceConfig,
        degradation: Arc<GracefulDegradationService>,
        registry: Arc<CircuitBreakerRegistry>,
        maintenance: Arc<AtomicBool>,
    ) -> Result<Self, ResilienceError> {
        let mut monitor = Self::new(config.monitor.clone(), degradation, registry, maintenance);
        for service in &config.services {
            monitor
                .criticals
                .insert(service.name.clone(), service.critical);
            if !service.depends_on.is_empty() {
                monitor
                    .dependencies
                    .insert(service.name.clone(), service.depends_on.clone());
            }
            if let Some(url) = &service.probe_url {
                monitor.register_probe(Arc::new(HttpProbe::new(service.name.clone(), url)?));
            }
        }
        Ok(monitor)
    }

    pub fn register_probe(&self, probe: Arc<dyn HealthProbe>) {
        self.probes
            .write()
            .expect("probe list lock poisoned")
            .push(probe);
    }

    /// Declare that `service` depends on `dependency`; the dependency's
    /// failure marks `service` at least degraded in snapshots.
    pub fn add_dependency(&mut self, service: &str, dependency: &str) {
        self.dependencies
            .entry(service.to_string())
            .or_default()
            .push(dependency.to_string());
    }

    /// Begin the periodic monitor loop. A second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            tracing::info!("Health monitor disabled");
            return;
        }
        let mut runner = self.runner.lock().expect("monitor runner lock poisoned");
        if runner.is_some() {
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            probe_timeout_ms = self.config.probe_timeout_ms,
            "Health monitor starting"
        );

        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_millis(monitor.config.interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.run_cycle().await;
                    }
                    _ = stop_rx.recv() => {
                        tracing::info!("Health monitor received stop signal, exiting loop");
                        break;
                    }
                }
            }
        });
        *runner = Some((stop_tx, handle));
    }

    /// Halt the periodic loop. In-flight probes finish on their own.
    pub fn stop(&self) {
        if let Some((stop_tx, _handle)) = self
            .runner
            .lock()
            .expect("monitor runner lock poisoned")
            .take()
        {
            let _ = stop_tx.send(());
        }
    }

    /// The current published snapshot.
    pub fn system_health(&self) -> Arc<SystemHealthSnapshot> {
        self.snapshot.load_full()
    }

    /// Synchronous re-evaluation outside the timer cadence.
    pub async fn force_health_check(&self) -> ForcedCheck {
        let started = Instant::now();
        let snapshot = self.run_cycle().await;
        ForcedCheck {
            forced: true,
            timestamp: snapshot.timestamp,
            overall: snapshot.overall,
            services: snapshot.services.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Is the process running. Never reports dependency health.
    pub fn liveness(&self) -> Liveness {
        Liveness {
            status: "alive",
            timestamp: unix_now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Can this process accept traffic: not in maintenance and no
    /// critical service unavailable. Degraded services still accept
    /// traffic; that is the point of the fallbacks.
    pub fn readiness(&self) -> Readiness {
        let snapshot = self.snapshot.load();
        let dependencies: BTreeMap<String, bool> = snapshot
            .services
            .iter()
            .map(|check| (check.service.clone(), check.status == ServiceStatus::Healthy))
            .collect();
        let blocked = self.maintenance.load(Ordering::Relaxed)
            || snapshot.services.iter().any(|check| {
                check.status == ServiceStatus::Unavailable && self.is_critical(&check.service)
            });
        Readiness {
            status: if blocked { "not_ready" } else { "ready" },
            timestamp: unix_now(),
            dependencies,
            services: snapshot.services.clone(),
        }
    }

    /// Run one full cycle: probe concurrently, merge, publish.
    pub async fn run_cycle(&self) -> Arc<SystemHealthSnapshot> {
        let cycle_start = Instant::now();
        let probe_timeout = Duration::from_millis(self.config.probe_timeout_ms);
        let probes: Vec<Arc<dyn HealthProbe>> = self
            .probes
            .read()
            .expect("probe list lock poisoned")
            .clone();

        // Each probe runs in its own task with an independent deadline so
        // one slow dependency cannot stall the others, and a panicking
        // probe cannot take the cycle down with it.
        let running: Vec<(String, JoinHandle<(Result<(), ResilienceError>, Duration)>)> = probes
            .into_iter()
            .map(|probe| {
                let service = probe.service().to_string();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let outcome = match time::timeout(probe_timeout, probe.check()).await {
                        Ok(result) => result,
                        Err(_) => Err(ResilienceError::Timeout(probe_timeout)),
                    };
                    (outcome, started.elapsed())
                });
                (service, handle)
            })
            .collect();

        let (names, handles): (Vec<_>, Vec<_>) = running.into_iter().unzip();
        let outcomes = join_all(handles).await;

        let mut checks: BTreeMap<String, ServiceCheck> = BTreeMap::new();
        for (service, joined) in names.into_iter().zip(outcomes) {
            let check = match joined {
                Ok((Ok(()), elapsed)) => ServiceCheck {
                    service: service.clone(),
                    status: ServiceStatus::Healthy,
                    response_time_ms: elapsed.as_millis() as u64,
                    error: None,
                },
                Ok((Err(ResilienceError::Timeout(_)), elapsed)) => ServiceCheck {
                    service: service.clone(),
                    status: ServiceStatus::Unavailable,
                    response_time_ms: elapsed.as_millis() as u64,
                    error: Some("timeout".to_string()),
                },
                Ok((Err(e), elapsed)) => ServiceCheck {
                    service: service.clone(),
                    status: ServiceStatus::Unavailable,
                    response_time_ms: elapsed.as_millis() as u64,
                    error: Some(e.to_string()),
                },
                Err(join_error) => {
                    tracing::error!(
                        service = %service,
                        error = %join_error,
                        "Health probe task failed"
                    );
                    ServiceCheck {
                        service: service.clone(),
                        status: ServiceStatus::Unavailable,
                        response_time_ms: probe_timeout.as_millis() as u64,
                        error: Some("probe task failed".to_string()),
                    }
                }
            };
            checks.insert(service, check);
        }

        // Conservative merge: degradation buckets...
        for view in self.degradation.service_views() {
            let entry = checks
                .entry(view.service.clone())
                .or_insert_with(|| healthy_check(&view.service));
            entry.status = entry.status.worst(view.status);
        }
        // ...and open breakers.
        for (service, status) in self.registry.statuses() {
            if status.state == CircuitState::Open {
                let entry = checks
                    .entry(service.clone())
                    .or_insert_with(|| healthy_check(&service));
                entry.status = ServiceStatus::Unavailable;
                if entry.error.is_none() {
                    entry.error = Some("circuit breaker open".to_string());
                }
            }
        }

        // Cascading failure awareness: a failed dependency marks its
        // dependents at least degraded, even when their own probe passes.
        let merged: HashMap<String, ServiceStatus> = checks
            .iter()
            .map(|(name, check)| (name.clone(), check.status))
            .collect();
        for (service, deps) in &self.dependencies {
            let impaired = deps.iter().find(|dep| {
                merged
                    .get(dep.as_str())
                    .map(|status| *status != ServiceStatus::Healthy)
                    .unwrap_or(false)
            });
            if let Some(dep) = impaired {
                let entry = checks
                    .entry(service.clone())
                    .or_insert_with(|| healthy_check(service));
                entry.status = entry.status.worst(ServiceStatus::Degraded);
                if entry.error.is_none() {
                    entry.error = Some(format!("dependency '{}' unhealthy", dep));
                }
            }
        }

        let service_count = checks.len() as u64;
        let overall = overall_status(
            checks
                .values()
                .map(|check| (check.status, self.is_critical(&check.service))),
        );

        for check in checks.values() {
            metrics::record_check(
                &check.service,
                check.status,
                Duration::from_millis(check.response_time_ms),
            );
        }
        let cycle_elapsed = cycle_start.elapsed();
        metrics::record_cycle(cycle_elapsed);

        let snapshot = Arc::new(SystemHealthSnapshot {
            overall,
            services: checks.into_values().collect(),
            breakers: self.registry.health_summary(),
            resources: ResourceMetrics {
                uptime_seconds: self.started_at.elapsed().as_secs(),
                monitored_services: service_count,
                last_cycle_ms: cycle_elapsed.as_millis() as u64,
            },
            timestamp: unix_now(),
        });
        self.snapshot.store(snapshot.clone());
        snapshot
    }

    fn is_critical(&self, service: &str) -> bool {
        self.criticals
            .get(service)
            .copied()
            .unwrap_or_else(|| self.degradation.is_critical(service))
    }
}

fn healthy_check(service: &str) -> ServiceCheck {
    ServiceCheck {
        service: service.to_string(),
        status: ServiceStatus::Healthy,
        response_time_ms: 0,
        error: None,
    }
}
