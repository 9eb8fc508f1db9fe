//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (from the front door)
//!     → MountRegistry::find(path)
//!     → hit:  rebase(prefix) → ContextBridge::forward → Dispatch::Mounted
//!     → miss: Fallback::handle (untouched) → Dispatch::Fallback
//! ```
//!
//! Order within one dispatch is fixed: match, rewrite, bridge, scope
//! acquire, pipeline invoke, scope release.

pub mod dispatcher;

pub use dispatcher::{Dispatch, DispatchError, Dispatcher};
