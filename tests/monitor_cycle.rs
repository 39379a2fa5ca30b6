//! Health monitor cycles: probes, merging, timeouts, dependency chains.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use resilience_core::config::ServiceConfig;
use resilience_core::degradation::{ExecuteOptions, ServiceStatus};
use resilience_core::error::ResilienceError;
use resilience_core::health::FnProbe;

mod common;

#[tokio::test]
async fn cycle_merges_probe_results() {
    let healthy = common::start_mock_backend(200).await;
    let failing = common::start_mock_backend(503).await;

    let mut config = common::fast_config();
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", healthy));
    let mut redis = ServiceConfig::new("redis");
    redis.probe_url = Some(format!("http://{}/health", failing));
    redis.critical = false;
    config.services = vec![database, redis];

    let stack = common::build_stack(&config);
    let snapshot = stack.monitor.run_cycle().await;

    let database = snapshot
        .services
        .iter()
        .find(|c| c.service == "database")
        .unwrap();
    assert_eq!(database.status, ServiceStatus::Healthy);

    let redis = snapshot
        .services
        .iter()
        .find(|c| c.service == "redis")
        .unwrap();
    assert_eq!(redis.status, ServiceStatus::Unavailable);
    assert!(redis.error.as_deref().unwrap().contains("503"));

    // Non-critical unavailable service degrades but does not sink the system.
    assert_eq!(snapshot.overall, ServiceStatus::Degraded);
}

#[tokio::test]
async fn hung_probe_is_reported_as_timeout_and_cycle_completes() {
    let hanging = common::start_hanging_backend().await;

    let mut config = common::fast_config();
    config.monitor.probe_timeout_ms = 100;
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", hanging));
    config.services = vec![database];

    let stack = common::build_stack(&config);
    let started = std::time::Instant::now();
    let forced = stack.monitor.force_health_check().await;

    // The cycle publishes well before the next tick would fire, with the
    // stuck probe marked as a timeout rather than blocking the cycle.
    assert!(started.elapsed() < Duration::from_secs(1));
    let database = forced
        .services
        .iter()
        .find(|c| c.service == "database")
        .unwrap();
    assert_eq!(database.status, ServiceStatus::Unavailable);
    assert_eq!(database.error.as_deref(), Some("timeout"));
    assert!(forced.forced);
}

#[tokio::test]
async fn forced_checks_are_idempotent_without_state_changes() {
    let healthy = common::start_mock_backend(200).await;

    let mut config = common::fast_config();
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", healthy));
    config.services = vec![database, ServiceConfig::new("redis")];

    let stack = common::build_stack(&config);
    let first = stack.monitor.force_health_check().await;
    let second = stack.monitor.force_health_check().await;

    let shape = |forced: &resilience_core::health::ForcedCheck| {
        forced
            .services
            .iter()
            .map(|c| (c.service.clone(), c.status, c.error.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&first), shape(&second));
    assert_eq!(first.overall, second.overall);
}

#[tokio::test]
async fn snapshot_is_never_healthier_than_the_degradation_bucket() {
    let healthy = common::start_mock_backend(200).await;

    let mut config = common::fast_config();
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", healthy));
    config.services = vec![database];

    let stack = common::build_stack(&config);
    let _ = stack
        .degradation
        .execute(
            "database",
            || async { Err::<serde_json::Value, _>(ResilienceError::Operation("down".into())) },
            ExecuteOptions::new().fallback_value(json!(null)),
        )
        .await;

    // Probe passes, but the bucket says degraded; conservative merge wins.
    let snapshot = stack.monitor.run_cycle().await;
    let database = snapshot
        .services
        .iter()
        .find(|c| c.service == "database")
        .unwrap();
    assert_eq!(database.status, ServiceStatus::Degraded);
}

#[tokio::test]
async fn open_breaker_marks_service_unavailable_in_snapshot() {
    let mut config = common::fast_config();
    config.breaker.failure_threshold = 1;
    config.breaker.open_duration_ms = 60_000;
    config.services = vec![ServiceConfig::new("payment-gateway")];

    let stack = common::build_stack(&config);
    let _ = stack
        .degradation
        .execute(
            "payment-gateway",
            || async { Err::<(), _>(ResilienceError::Operation("declined".into())) },
            ExecuteOptions::new(),
        )
        .await;

    let snapshot = stack.monitor.run_cycle().await;
    let gateway = snapshot
        .services
        .iter()
        .find(|c| c.service == "payment-gateway")
        .unwrap();
    assert_eq!(gateway.status, ServiceStatus::Unavailable);
    assert_eq!(snapshot.breakers.open, 1);
}

#[tokio::test]
async fn dependency_failure_degrades_dependent_service() {
    let healthy = common::start_mock_backend(200).await;
    let failing = common::start_mock_backend(500).await;

    let mut config = common::fast_config();
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", failing));
    database.critical = false;
    let mut orders = ServiceConfig::new("orders");
    orders.probe_url = Some(format!("http://{}/health", healthy));
    orders.depends_on = vec!["database".to_string()];
    config.services = vec![database, orders];

    let stack = common::build_stack(&config);
    let snapshot = stack.monitor.run_cycle().await;

    let orders = snapshot
        .services
        .iter()
        .find(|c| c.service == "orders")
        .unwrap();
    assert_eq!(orders.status, ServiceStatus::Degraded);
    assert!(orders
        .error
        .as_deref()
        .unwrap()
        .contains("dependency 'database'"));
}

#[tokio::test]
async fn periodic_loop_publishes_and_stop_halts_it() {
    let healthy = common::start_mock_backend(200).await;

    let mut config = common::fast_config();
    config.monitor.interval_ms = 25;
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", healthy));
    config.services = vec![database];

    let stack = common::build_stack(&config);
    let before = stack.monitor.system_health();
    assert!(before.services.is_empty());

    stack.monitor.start();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let published = stack.monitor.system_health();
    assert_eq!(published.services.len(), 1);
    assert_eq!(published.overall, ServiceStatus::Healthy);

    stack.monitor.stop();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let settled = stack.monitor.system_health();
    tokio::time::sleep(Duration::from_millis(100)).await;
    // No further cycles publish after stop.
    assert!(Arc::ptr_eq(&settled, &stack.monitor.system_health()));
}

#[tokio::test]
async fn fn_probe_failures_are_isolated_per_service() {
    let config = common::fast_config();
    let stack = common::build_stack(&config);

    stack
        .monitor
        .register_probe(Arc::new(FnProbe::new("redis", || async { Ok(()) })));
    stack.monitor.register_probe(Arc::new(FnProbe::new(
        "database",
        || async { Err(ResilienceError::MalformedProbe("empty body".into())) },
    )));

    let snapshot = stack.monitor.run_cycle().await;
    let redis = snapshot
        .services
        .iter()
        .find(|c| c.service == "redis")
        .unwrap();
    assert_eq!(redis.status, ServiceStatus::Healthy);
    let database = snapshot
        .services
        .iter()
        .find(|c| c.service == "database")
        .unwrap();
    assert_eq!(database.status, ServiceStatus::Unavailable);
}
