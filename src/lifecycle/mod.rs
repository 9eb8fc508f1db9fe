//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build apps → Start apps on NullListener
//!     → Register mounts (config order) → Dispatcher → Bind front door
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Stop apps → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then applications, then the listener
//! - Fail fast: any startup error is fatal
//! - Shutdown has a deadline: applications are stopped after it regardless

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Host, HostBuilder, StartupError};
