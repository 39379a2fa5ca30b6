//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use resilience_core::config::ResilienceConfig;
use resilience_core::degradation::GracefulDegradationService;
use resilience_core::events::EventBus;
use resilience_core::health::HealthMonitorService;
use resilience_core::http::{AppState, OpsServer};
use resilience_core::lifecycle::Shutdown;
use resilience_core::resilience::CircuitBreakerRegistry;

/// The full resilience trio wired the way main() wires it.
pub struct TestStack {
    pub events: EventBus,
    pub maintenance: Arc<AtomicBool>,
    pub registry: Arc<CircuitBreakerRegistry>,
    pub degradation: Arc<GracefulDegradationService>,
    pub monitor: Arc<HealthMonitorService>,
}

pub fn build_stack(config: &ResilienceConfig) -> TestStack {
    let maintenance = Arc::new(AtomicBool::new(config.maintenance_mode));
    let events = EventBus::new(config.events.buffer, maintenance.clone());
    let registry = Arc::new(CircuitBreakerRegistry::from_config(config, events.clone()));
    let degradation = Arc::new(GracefulDegradationService::from_config(
        config,
        registry.clone(),
        events.clone(),
    ));
    let monitor = Arc::new(
        HealthMonitorService::from_config(
            config,
            degradation.clone(),
            registry.clone(),
            maintenance.clone(),
        )
        .expect("monitor config should be valid"),
    );
    TestStack {
        events,
        maintenance,
        registry,
        degradation,
        monitor,
    }
}

/// Configuration with sub-second timings for test determinism.
#[allow(dead_code)]
pub fn fast_config() -> ResilienceConfig {
    let mut config = ResilienceConfig::default();
    config.monitor.interval_ms = 50;
    config.monitor.probe_timeout_ms = 200;
    config.breaker.open_duration_ms = 100;
    config.degradation.default_timeout_ms = 500;
    config.degradation.retry_base_delay_ms = 1;
    config.degradation.retry_max_delay_ms = 5;
    config
}

/// Bind the ops server on an ephemeral port and serve until shutdown.
#[allow(dead_code)]
pub async fn spawn_ops_server(stack: &TestStack, api_key: &str) -> (SocketAddr, Shutdown) {
    let state = AppState {
        monitor: stack.monitor.clone(),
        degradation: stack.degradation.clone(),
        registry: stack.registry.clone(),
        events: stack.events.clone(),
        maintenance: stack.maintenance.clone(),
        api_key: api_key.to_string(),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = OpsServer::new(state).run(listener, rx).await;
    });
    (addr, shutdown)
}

/// Start a mock probe target that answers every request with `status`.
/// Returns the bound address.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let body = "{}";
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock probe target that accepts connections but never answers.
#[allow(dead_code)]
pub async fn start_hanging_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        // Hold the connection open without responding.
                        let _socket = socket;
                        std::future::pending::<()>().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
