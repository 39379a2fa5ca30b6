//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors reported)
//!     → ResilienceConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → valid: forwarded to the reload task
//!     → invalid: rejected, last-known-good configuration stays active
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BreakerSettings, DegradationSettings, EventsConfig, MonitorConfig, ObservabilityConfig,
    ResilienceConfig, ServerConfig, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
