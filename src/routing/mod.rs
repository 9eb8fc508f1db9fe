//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     MountConfig[] (config order)
//!     → matcher.rs (validate prefix, fail fast)
//!     → router.rs (append MountEntry)
//!     → Freeze as Arc<MountRegistry>
//!
//! Incoming request path:
//!     → router.rs (scan entries in order)
//!     → matcher.rs (segment-aligned prefix test)
//!     → Return: first matching MountEntry or NoMatch
//! ```
//!
//! # Design Decisions
//! - Mounts registered at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same mount
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{MountError, PathPrefix};
pub use router::{MountEntry, MountRegistry};
