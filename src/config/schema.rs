//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! resilience layer. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the resilience layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Operational HTTP server (health + admin endpoints).
    pub server: ServerConfig,

    /// Health monitor scheduling.
    pub monitor: MonitorConfig,

    /// Registry-wide circuit breaker defaults.
    pub breaker: BreakerSettings,

    /// Degradation service tuning (timeouts, retries, recovery).
    pub degradation: DegradationSettings,

    /// Tracked service definitions.
    pub services: Vec<ServiceConfig>,

    /// Event bus and webhook delivery settings.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Maintenance mode: readiness reports not_ready, alerting is muted.
    pub maintenance_mode: bool,
}

/// Operational HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8088").
    pub bind_address: String,

    /// API key for the full health view and admin endpoints (Bearer token).
    pub api_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8088".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Health monitor scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Enable the periodic monitor loop.
    pub enabled: bool,

    /// Poll interval in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            probe_timeout_ms: 2_000,
        }
    }
}

/// Circuit breaker settings, registry defaults or per-service overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,

    /// Cooldown before a half-open probe is allowed, in milliseconds.
    pub open_duration_ms: u64,

    /// Trial calls admitted while half-open.
    pub half_open_trials: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 30_000,
            half_open_trials: 3,
        }
    }
}

/// Degradation service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DegradationSettings {
    /// Default per-operation deadline in milliseconds.
    pub default_timeout_ms: u64,

    /// Default retry attempts after a failed operation.
    pub max_retries: u32,

    /// Base delay for retry backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for retry backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Consecutive successes required before a service returns to healthy.
    pub recovery_threshold: u32,

    /// Recent-operation window consulted for the healthy invariant.
    pub health_window: usize,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            max_retries: 0,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2_000,
            recovery_threshold: 5,
            health_window: 10,
        }
    }
}

/// One tracked service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name; keys the breaker, the health bucket, and the probe.
    pub name: String,

    /// Critical services make the whole system unavailable when they are.
    #[serde(default = "default_critical")]
    pub critical: bool,

    /// HTTP endpoint probed by the health monitor.
    #[serde(default)]
    pub probe_url: Option<String>,

    /// Per-service operation deadline override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Services this one depends on; their failure degrades this one.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Per-service breaker overrides.
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub open_duration_ms: Option<u64>,
    #[serde(default)]
    pub half_open_trials: Option<u32>,
}

fn default_critical() -> bool {
    true
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            critical: true,
            probe_url: None,
            timeout_ms: None,
            depends_on: Vec::new(),
            failure_threshold: None,
            open_duration_ms: None,
            half_open_trials: None,
        }
    }

    /// Merged breaker settings when any field overrides the defaults.
    pub fn breaker_overrides(&self, defaults: &BreakerSettings) -> Option<BreakerSettings> {
        if self.failure_threshold.is_none()
            && self.open_duration_ms.is_none()
            && self.half_open_trials.is_none()
        {
            return None;
        }
        Some(BreakerSettings {
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            open_duration_ms: self.open_duration_ms.unwrap_or(defaults.open_duration_ms),
            half_open_trials: self.half_open_trials.unwrap_or(defaults.half_open_trials),
        })
    }
}

/// Event bus and webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast buffer per subscriber.
    pub buffer: usize,

    /// Optional endpoint for fire-and-forget event delivery.
    pub webhook_url: Option<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            buffer: 256,
            webhook_url: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
