//! resilience-core: the resilience layer of the ordering platform.
//!
//! Composes the circuit-breaker registry, the graceful-degradation
//! service, and the health monitor, then serves the operational HTTP
//! endpoints until shutdown.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use resilience_core::config::{load_config, ConfigWatcher, ResilienceConfig};
use resilience_core::degradation::GracefulDegradationService;
use resilience_core::events::{spawn_webhook_sink, EventBus};
use resilience_core::health::HealthMonitorService;
use resilience_core::http::{AppState, OpsServer};
use resilience_core::lifecycle::Shutdown;
use resilience_core::observability::{logging, metrics};
use resilience_core::resilience::CircuitBreakerRegistry;

#[derive(Parser)]
#[command(name = "resilience-core", version, about = "Resilience layer: circuit breakers, graceful degradation, health monitoring")]
struct Args {
    /// Path to the TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ResilienceConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        services = config.services.len(),
        interval_ms = config.monitor.interval_ms,
        "resilience-core starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let maintenance = Arc::new(AtomicBool::new(config.maintenance_mode));
    let events = EventBus::new(config.events.buffer, maintenance.clone());
    let registry = Arc::new(CircuitBreakerRegistry::from_config(&config, events.clone()));
    let degradation = Arc::new(GracefulDegradationService::from_config(
        &config,
        registry.clone(),
        events.clone(),
    ));
    let monitor = Arc::new(HealthMonitorService::from_config(
        &config,
        degradation.clone(),
        registry.clone(),
        maintenance.clone(),
    )?);
    monitor.start();

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    if let Some(url) = &config.events.webhook_url {
        match url::Url::parse(url) {
            Ok(parsed) => {
                spawn_webhook_sink(parsed, &events, shutdown.subscribe());
            }
            Err(e) => tracing::error!(url = %url, error = %e, "Invalid webhook URL"),
        }
    }

    // Hot reload: a valid new config updates the maintenance flag; an
    // invalid file is rejected inside the watcher and the last-known-good
    // configuration stays active.
    let mut watcher_guard = None;
    if let Some(path) = &args.config {
        let (watcher, mut updates) = ConfigWatcher::new(path);
        watcher_guard = Some(watcher.run()?);
        let maintenance = maintenance.clone();
        tokio::spawn(async move {
            while let Some(new_config) = updates.recv().await {
                tracing::info!("Configuration reloaded");
                maintenance.store(new_config.maintenance_mode, Ordering::Relaxed);
            }
        });
    }

    let state = AppState {
        monitor: monitor.clone(),
        degradation,
        registry,
        events,
        maintenance,
        api_key: config.server.api_key.clone(),
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = OpsServer::new(state);
    server.run(listener, shutdown.subscribe()).await?;

    monitor.stop();
    drop(watcher_guard);
    tracing::info!("Shutdown complete");
    Ok(())
}
