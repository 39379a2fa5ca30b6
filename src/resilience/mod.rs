//! Circuit breaking subsystem.
//!
//! # Data Flow
//! ```text
//! Wrapped operation:
//!     → registry.rs (look up breaker by service name, admit or reject)
//!     → circuit_breaker.rs (state machine, failure/success accounting)
//!     → On retry: backoff.rs (jittered exponential delay)
//! ```
//!
//! # Design Decisions
//! - One breaker per service name, created lazily, never destroyed
//! - The degradation layer reads state and reports outcomes; it never
//!   mutates breaker internals directly
//! - Open circuits fail fast; no call waits on a known-bad dependency

pub mod backoff;
pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{BreakerStatus, CircuitBreaker, CircuitState};
pub use registry::{BreakerSummary, CircuitBreakerRegistry};
