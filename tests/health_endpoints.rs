//! Operational HTTP surface: liveness, readiness, auth gating, admin.

use serde_json::json;

use resilience_core::config::ServiceConfig;

mod common;

const API_KEY: &str = "test-ops-key";

#[tokio::test]
async fn liveness_reports_process_only() {
    let config = common::fast_config();
    let stack = common::build_stack(&config);
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;

    let body: serde_json::Value = reqwest::get(format!("http://{}/health/live", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "alive");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
    // Liveness never carries dependency health.
    assert!(body.get("services").is_none());

    shutdown.trigger();
}

#[tokio::test]
async fn unauthenticated_health_gets_status_only() {
    let healthy = common::start_mock_backend(200).await;
    let mut config = common::fast_config();
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", healthy));
    config.services = vec![database];

    let stack = common::build_stack(&config);
    stack.monitor.run_cycle().await;
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;
    let client = reqwest::Client::new();

    let bare: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bare["status"], "healthy");
    assert!(bare.get("services").is_none());
    assert!(bare.get("breakers").is_none());

    let full: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(full["overall"], "healthy");
    assert_eq!(full["services"][0]["service"], "database");
    assert!(full["breakers"]["total"].is_u64());
    assert!(full["resources"]["uptime_seconds"].is_u64());

    shutdown.trigger();
}

#[tokio::test]
async fn forced_check_requires_auth_and_reevaluates() {
    let healthy = common::start_mock_backend(200).await;
    let mut config = common::fast_config();
    let mut redis = ServiceConfig::new("redis");
    redis.probe_url = Some(format!("http://{}/ping", healthy));
    config.services = vec![redis];

    let stack = common::build_stack(&config);
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;
    let client = reqwest::Client::new();

    let unauthorized = client
        .post(format!("http://{}/health/check", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    let forced: serde_json::Value = client
        .post(format!("http://{}/health/check", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(forced["forced"], true);
    assert_eq!(forced["overall"], "healthy");
    assert_eq!(forced["services"][0]["service"], "redis");
    assert!(forced["duration_ms"].is_u64());

    shutdown.trigger();
}

#[tokio::test]
async fn readiness_follows_maintenance_mode() {
    let config = common::fast_config();
    let stack = common::build_stack(&config);
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;
    let client = reqwest::Client::new();

    let ready = client
        .get(format!("http://{}/health/ready", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);

    let toggled = client
        .post(format!("http://{}/admin/maintenance", addr))
        .bearer_auth(API_KEY)
        .json(&json!({"enabled": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(toggled.status(), 200);

    let blocked = client
        .get(format!("http://{}/health/ready", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 503);
    let body: serde_json::Value = blocked.json().await.unwrap();
    assert_eq!(body["status"], "not_ready");

    let untoggled = client
        .post(format!("http://{}/admin/maintenance", addr))
        .bearer_auth(API_KEY)
        .json(&json!({"enabled": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(untoggled.status(), 200);

    let ready_again = client
        .get(format!("http://{}/health/ready", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(ready_again.status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn readiness_is_not_ready_when_critical_service_unavailable() {
    let failing = common::start_mock_backend(503).await;
    let mut config = common::fast_config();
    let mut database = ServiceConfig::new("database");
    database.probe_url = Some(format!("http://{}/health", failing));
    config.services = vec![database];

    let stack = common::build_stack(&config);
    stack.monitor.run_cycle().await;
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;

    let response = reqwest::get(format!("http://{}/health/ready", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["dependencies"]["database"], false);

    shutdown.trigger();
}

#[tokio::test]
async fn admin_endpoints_require_auth() {
    let config = common::fast_config();
    let stack = common::build_stack(&config);
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;
    let client = reqwest::Client::new();

    let unauthorized = client
        .get(format!("http://{}/admin/breakers", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    let wrong_key = client
        .get(format!("http://{}/admin/breakers", addr))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_key.status(), 401);

    let authorized = client
        .get(format!("http://{}/admin/breakers", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn admin_state_override_is_visible_in_service_view() {
    let config = common::fast_config();
    let stack = common::build_stack(&config);
    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/admin/services/database/state", addr))
        .bearer_auth(API_KEY)
        .json(&json!({"state": "degraded"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let services: serde_json::Value = client
        .get(format!("http://{}/admin/services", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(services["overall"], "degraded");
    let database = services["services"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["service"] == "database")
        .unwrap();
    assert_eq!(database["status"], "degraded");

    shutdown.trigger();
}

#[tokio::test]
async fn breaker_reset_closes_open_circuits() {
    let mut config = common::fast_config();
    config.breaker.failure_threshold = 1;
    config.breaker.open_duration_ms = 60_000;
    let stack = common::build_stack(&config);

    let _ = stack
        .degradation
        .execute(
            "database",
            || async {
                Err::<(), _>(resilience_core::error::ResilienceError::Operation(
                    "down".into(),
                ))
            },
            resilience_core::degradation::ExecuteOptions::new(),
        )
        .await;

    let (addr, shutdown) = common::spawn_ops_server(&stack, API_KEY).await;
    let client = reqwest::Client::new();

    let before: serde_json::Value = client
        .get(format!("http://{}/admin/breakers", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["summary"]["open"], 1);
    assert_eq!(before["breakers"]["database"]["state"], "open");

    let reset = client
        .post(format!("http://{}/admin/breakers/reset", addr))
        .bearer_auth(API_KEY)
        .json(&json!({"service": "database"}))
        .send()
        .await
        .unwrap();
    assert_eq!(reset.status(), 200);

    let after: serde_json::Value = client
        .get(format!("http://{}/admin/breakers", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["summary"]["open"], 0);

    shutdown.trigger();
}
