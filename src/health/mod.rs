//! Health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic cycle (monitor.rs):
//!     Timer tick
//!     → probe.rs (concurrent checks, independent deadlines)
//!     → merge with breaker states + degradation buckets
//!     → snapshot.rs (immutable aggregate, atomic publication)
//!
//! On-demand (monitor.rs):
//!     forced check / liveness / readiness
//! ```
//!
//! # Design Decisions
//! - The monitor is the conservative aggregator: never healthier than
//!   any of its three information sources
//! - A probe that does not finish is reported as timeout; the cycle
//!   still publishes
//! - Snapshot readers see the old or the new snapshot, never a mix

pub mod monitor;
pub mod probe;
pub mod snapshot;

pub use monitor::HealthMonitorService;
pub use probe::{FnProbe, HealthProbe, HttpProbe};
pub use snapshot::{
    ForcedCheck, Liveness, Readiness, ServiceCheck, SystemHealthSnapshot,
};
