//! Hosting subsystem: what a mounted application looks like to the router.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     AppBuilder (application.rs)
//!     → ServiceCollection → ServiceProvider (services.rs)
//!     → axum Router → RouterPipeline (router_pipeline.rs)
//!     → Application::start on a NullListener
//!     → (pipeline(), scope_factory()) handed to the mount registry
//!
//! Per request:
//!     ScopeFactory::create_scope → Scope
//!     → Pipeline::handle(ctx, &scope)
//!     → Scope dropped (released)
//! ```
//!
//! # Design Decisions
//! - The router sees only the traits in pipeline.rs
//! - One service container per application; nothing shared across mounts
//! - Scope is passed explicitly, there is no ambient "current services"

pub mod application;
pub mod pipeline;
pub mod router_pipeline;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{AppBuilder, AppState, Application, ApplicationError, DEFAULT_BODY_LIMIT};
pub use pipeline::{BoxError, Fallback, Pipeline, PipelineError, ScopeFactory};
pub use router_pipeline::RouterPipeline;
pub use services::{Scope, ScopeError, ScopeStats, ScopedServices, ServiceCollection, ServiceProvider};
