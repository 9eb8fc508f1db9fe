//! Context bridge subsystem.
//!
//! # Data Flow
//! ```text
//! Rebased RequestContext + MountEntry
//!     → strategy.rs (alias: use as-is | clone: isolated copy)
//!     → forward.rs
//!         → scope acquire (mount's ScopeFactory)
//!         → pipeline invoke (raced against cancellation)
//!         → scope release (always)
//!     → Response or BridgeError
//! ```

pub mod forward;
pub mod strategy;

pub use forward::{BridgeError, ContextBridge};
pub use strategy::BridgeStrategy;
