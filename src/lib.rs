//! In-process mount host.
//!
//! Several independently built HTTP applications share one listener. Each
//! is mounted under a path prefix; the dispatcher strips the prefix, runs
//! the request through the application's own pipeline inside a fresh
//! service scope and returns its response. Requests no mount claims go to
//! the host's fallback pipeline.

pub mod bridge;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod hosting;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use bridge::{BridgeStrategy, ContextBridge};
pub use config::HostConfig;
pub use context::RequestContext;
pub use dispatch::{Dispatch, Dispatcher};
pub use hosting::{AppBuilder, Application};
pub use http::HttpServer;
pub use lifecycle::{Host, HostBuilder, Shutdown};
pub use routing::MountRegistry;
