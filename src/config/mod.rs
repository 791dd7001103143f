//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or DaemonConfig::default()
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DaemonConfig (validated, immutable)
//!     → borrowed by startup to size the arena, bind the listener, build the worker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{DaemonConfig, FailurePolicy, ListenerConfig, ObservabilityConfig, WorkerConfig};
pub use validation::{validate_config, ValidationError};
