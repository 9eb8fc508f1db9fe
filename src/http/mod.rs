//! HTTP front door subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (the process's only listener)
//!     → server.rs (axum setup, middleware)
//!     → request.rs (request ID set/propagate)
//!     → front_door handler: Request<Body> → RequestContext
//!     → dispatcher (mount or fallback)
//!     → response.rs (dispatch errors → status codes)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
