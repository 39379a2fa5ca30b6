//! Resilience layer: circuit breaking, graceful degradation, and health
//! monitoring for services with unreliable dependencies.
//!
//! Application code calls [`GracefulDegradationService::execute`] instead
//! of invoking a dependency directly; the layer consults the per-service
//! circuit breaker, bounds the call with a deadline, retries, substitutes
//! fallbacks, and keeps a per-service health bucket. An independent
//! [`HealthMonitorService`] polls dependency probes and publishes an
//! immutable system-wide snapshot served over the operational HTTP
//! endpoints.
//!
//! Services are explicitly constructed and injected — there are no
//! process-wide singletons, so tests compose isolated instances.

pub mod admin;
pub mod config;
pub mod degradation;
pub mod error;
pub mod events;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ResilienceConfig;
pub use degradation::{ExecuteOptions, Fallback, GracefulDegradationService, ServiceStatus};
pub use error::ResilienceError;
pub use events::{EventBus, HealthEvent};
pub use health::{HealthMonitorService, SystemHealthSnapshot};
pub use http::{AppState, OpsServer};
pub use lifecycle::Shutdown;
pub use resilience::{CircuitBreakerRegistry, CircuitState};
