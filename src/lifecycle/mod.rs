//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize subsystems → Start monitor,
//!     watcher, sinks → Serve ops endpoints
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → tasks drain and exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core services, then listeners
//! - Shutdown fans out over a broadcast channel; no task polls

pub mod shutdown;

pub use shutdown::Shutdown;
