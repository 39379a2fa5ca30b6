//! Operational HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → health handlers (liveness / readiness / snapshot / forced check)
//!     → admin handlers (authenticated overrides)
//! ```

pub mod server;

pub use server::{AppState, OpsServer};
