//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Front door:
//!     TcpListener (http::server) → axum::serve → dispatcher
//!
//! Mounted applications:
//!     Application::start
//!     → server.rs (Server contract)
//!     → null_listener.rs (no bind, no accept, empty features)
//! ```
//!
//! # Design Decisions
//! - Exactly one socket per process, owned by the front door
//! - Mounted applications still go through start/stop so startup hooks run

pub mod null_listener;
pub mod server;

pub use null_listener::NullListener;
pub use server::{Server, ServerError, ServerFeatures};
