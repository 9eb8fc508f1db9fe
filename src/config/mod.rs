//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, mount prefixes)
//!     → HostConfig (validated, immutable)
//!     → CLI overrides applied by the binary
//!     → read once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload (mounts are fixed
//!   for the process lifetime)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BridgeConfig, HostConfig, ListenerConfig, MountConfig, ObservabilityConfig, TimeoutConfig};
pub use validation::ValidationError;
