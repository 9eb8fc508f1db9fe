//! Contracts between the router and a mounted application.
//!
//! The router only ever calls through these traits; it never inspects how a
//! pipeline routes or handles a request.

use async_trait::async_trait;
use axum::response::Response;
use thiserror::Error;

use crate::context::{ContextError, RequestContext};
use crate::hosting::services::{Scope, ScopeError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure raised by a pipeline while processing a request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline could not render request: {0}")]
    Context(#[from] ContextError),

    #[error("pipeline failed: {0}")]
    Handler(#[source] BoxError),
}

impl PipelineError {
    pub fn handler(err: impl Into<BoxError>) -> Self {
        PipelineError::Handler(err.into())
    }
}

/// One mounted application's request pipeline.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Process one request inside `scope`.
    async fn handle(
        &self,
        ctx: &mut RequestContext,
        scope: &Scope,
    ) -> Result<Response, PipelineError>;
}

/// Handler for requests no mount claims. Receives the context unmodified.
#[async_trait]
pub trait Fallback: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<Response, PipelineError>;
}

/// Creates one isolated scope per dispatched request.
pub trait ScopeFactory: Send + Sync {
    fn create_scope(&self) -> Result<Scope, ScopeError>;
}
