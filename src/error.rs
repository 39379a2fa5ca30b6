//! Error taxonomy for the resilience layer.
//!
//! # Design Decisions
//! - One enum for the whole layer; callers match on variants, not strings
//! - Timeouts are failures for breaker and health-bucket purposes
//! - `CircuitOpen` never reflects an executed operation

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the resilience layer.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The wrapped operation itself failed.
    #[error("operation failed: {0}")]
    Operation(String),

    /// The wrapped operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Call rejected without execution because the breaker is open.
    #[error("circuit breaker open for service '{service}'")]
    CircuitOpen { service: String },

    /// Invalid configuration supplied at apply time.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A health probe returned an unexpected or empty result.
    #[error("malformed probe response: {0}")]
    MalformedProbe(String),
}

impl ResilienceError {
    /// True when the call was rejected by an open breaker.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ResilienceError::Operation(_) => "operation",
            ResilienceError::Timeout(_) => "timeout",
            ResilienceError::CircuitOpen { .. } => "circuit_open",
            ResilienceError::Configuration(_) => "configuration",
            ResilienceError::MalformedProbe(_) => "malformed_probe",
        }
    }
}
