//! Graceful degradation subsystem.
//!
//! # Data Flow
//! ```text
//! Application call:
//!     → service.rs (execute: breaker consult → timed attempt → retry)
//!     → On failure: fallback.rs (static value or fallback function)
//!     → state.rs (per-service bucket: Healthy/Degraded/Unavailable)
//!     → events (state-change, recovery notifications)
//! ```
//!
//! # Design Decisions
//! - Callers see a result, a fallback result, or the original error;
//!   transient dependency failure is invisible wherever a fallback works
//! - A working fallback means Degraded; no usable fallback means
//!   Unavailable — downstream aggregation depends on the distinction
//! - Buckets and breakers are separate stores keyed by the same names,
//!   reconciled by reads only

pub mod fallback;
pub mod service;
pub mod state;

pub use fallback::{ExecuteOptions, Fallback};
pub use service::{DegradationHealthView, GracefulDegradationService, DATABASE, REDIS};
pub use state::{overall_status, ServiceHealth, ServiceStatus};
