//! Event and alert integration subsystem.
//!
//! # Data Flow
//! ```text
//! degradation + breaker registry produce:
//!     → bus.rs (broadcast channel, at-most-once, non-blocking emit)
//!
//! Consumers:
//!     → webhook.rs (fire-and-forget POST to external alerting)
//!     → in-process subscribers (tests, audit hooks)
//! ```
//!
//! # Design Decisions
//! - Emitters never block and never observe delivery failures
//! - Subscribers that fall behind lose events (lag, not backpressure)
//! - Maintenance mode mutes delivery without muting logs

pub mod bus;
pub mod webhook;

pub use bus::{EventBus, HealthEvent};
pub use webhook::spawn_webhook_sink;
