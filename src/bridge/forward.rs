//! Forwarding a matched request into a mounted pipeline.
//!
//! # Responsibilities
//! - Prepare the context the pipeline runs against (alias or clone)
//! - Acquire one scope from the mount's factory
//! - Invoke the pipeline, racing it against request cancellation
//! - Release the scope on every exit path
//!
//! # Design Decisions
//! - Pipeline errors are propagated with their source, never translated
//! - Scope creation failure fails only this request
//! - Under alias the borrow checker keeps the pipeline from retaining the
//!   caller's context past the call

use axum::response::Response;
use thiserror::Error;

use crate::bridge::strategy::BridgeStrategy;
use crate::context::RequestContext;
use crate::hosting::{PipelineError, ScopeError};
use crate::routing::MountEntry;

/// Failures of one forwarded request.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("mount `{mount}` could not create a request scope: {source}")]
    Scope {
        mount: String,
        #[source]
        source: ScopeError,
    },

    #[error("mount `{mount}` failed: {source}")]
    Pipeline {
        mount: String,
        #[source]
        source: PipelineError,
    },

    #[error("request to mount `{mount}` was cancelled")]
    Cancelled { mount: String },
}

/// Carries a rebased context into the mount's pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBridge {
    strategy: BridgeStrategy,
}

impl ContextBridge {
    pub fn new(strategy: BridgeStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> BridgeStrategy {
        self.strategy
    }

    /// Run `entry`'s pipeline for `ctx`. The context must already be rebased.
    pub async fn forward(
        &self,
        ctx: &mut RequestContext,
        entry: &MountEntry,
    ) -> Result<Response, BridgeError> {
        match self.strategy {
            BridgeStrategy::Alias => run_scoped(ctx, entry, self.strategy).await,
            BridgeStrategy::Clone => {
                let mut bridged = ctx.isolated_clone().await;
                run_scoped(&mut bridged, entry, self.strategy).await
            }
        }
    }
}

async fn run_scoped(
    ctx: &mut RequestContext,
    entry: &MountEntry,
    strategy: BridgeStrategy,
) -> Result<Response, BridgeError> {
    let scope = entry
        .scope_factory()
        .create_scope()
        .map_err(|source| BridgeError::Scope {
            mount: entry.name().to_string(),
            source,
        })?;

    tracing::debug!(
        mount = %entry.name(),
        path = %ctx.path,
        path_base = %ctx.path_base,
        scope_id = %scope.id(),
        strategy = %strategy,
        "Forwarding request"
    );

    let token = ctx.cancellation.clone();
    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(BridgeError::Cancelled {
            mount: entry.name().to_string(),
        }),
        result = entry.pipeline().handle(ctx, &scope) => result.map_err(|source| {
            BridgeError::Pipeline {
                mount: entry.name().to_string(),
                source,
            }
        }),
    };

    drop(scope);
    result
}
