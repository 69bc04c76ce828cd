//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment variables (PORT, DEMO_MODE, API_URL, ...)
//!     → CLI overrides (--role, --port)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig / LoadgenConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; runtime toggles live in `state`, not here
//! - All fields have defaults so an empty environment starts a working service
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_loadgen_config, ConfigError};
pub use schema::{
    IdentityConfig, LoadgenConfig, LogFormat, ObservabilityConfig, ServiceConfig, ServiceRole,
    StageConfig, TimeoutConfig,
};
