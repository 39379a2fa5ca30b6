//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with per-call fields, not formatted strings
//! - Metrics are cheap (atomic increments behind the metrics facade)
//! - Recording before init is a silent no-op, never an error

pub mod logging;
pub mod metrics;
