//! Front-door dispatch.
//!
//! # Responsibilities
//! - Look up the mount for a request path
//! - On a hit: rebase the context, forward through the bridge
//! - On a miss: hand the untouched context to the fallback
//!
//! # Design Decisions
//! - No business logic; a routing decision plus a path rewrite
//! - Mount registry is shared read-only; no locking per request
//! - Failures are returned, never panicked, so one mount cannot take down
//!   requests routed elsewhere

use std::sync::Arc;
use std::time::Instant;

use axum::response::Response;
use thiserror::Error;

use crate::bridge::{BridgeError, ContextBridge};
use crate::context::RequestContext;
use crate::hosting::{Fallback, PipelineError};
use crate::observability::metrics;
use crate::routing::MountRegistry;

/// Result of a successful dispatch.
#[derive(Debug)]
pub enum Dispatch {
    /// A mount handled the request.
    Mounted { mount: String, response: Response },
    /// No mount matched; the fallback handled the request.
    Fallback { response: Response },
}

impl Dispatch {
    /// True when a mount handled the request.
    pub fn handled(&self) -> bool {
        matches!(self, Dispatch::Mounted { .. })
    }

    pub fn mount(&self) -> Option<&str> {
        match self {
            Dispatch::Mounted { mount, .. } => Some(mount),
            Dispatch::Fallback { .. } => None,
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            Dispatch::Mounted { response, .. } | Dispatch::Fallback { response } => response,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Mount(#[from] BridgeError),

    #[error("fallback failed: {0}")]
    Fallback(#[source] PipelineError),
}

/// Routes each inbound request to a mount or to the fallback.
pub struct Dispatcher {
    mounts: Arc<MountRegistry>,
    bridge: ContextBridge,
    fallback: Arc<dyn Fallback>,
}

impl Dispatcher {
    pub fn new(mounts: Arc<MountRegistry>, bridge: ContextBridge, fallback: Arc<dyn Fallback>) -> Self {
        Self {
            mounts,
            bridge,
            fallback,
        }
    }

    pub fn mounts(&self) -> &MountRegistry {
        &self.mounts
    }

    pub fn bridge(&self) -> &ContextBridge {
        &self.bridge
    }

    /// Dispatch one request.
    ///
    /// On a hit the caller's `path`/`path_base` are rewritten in place before
    /// forwarding; on a miss the context reaches the fallback unmodified.
    pub async fn dispatch(&self, ctx: &mut RequestContext) -> Result<Dispatch, DispatchError> {
        let start = Instant::now();

        let Some(entry) = self.mounts.find(&ctx.path) else {
            tracing::debug!(path = %ctx.path, "No mount matched, using fallback");
            let result = self.fallback.handle(ctx).await;
            metrics::record_dispatch(
                metrics::FALLBACK_LABEL,
                if result.is_ok() { "ok" } else { "error" },
                start,
            );
            return result
                .map(|response| Dispatch::Fallback { response })
                .map_err(DispatchError::Fallback);
        };

        ctx.rebase(entry.prefix());
        let result = self.bridge.forward(ctx, entry).await;
        metrics::record_dispatch(entry.name(), outcome_label(&result), start);

        match result {
            Ok(response) => Ok(Dispatch::Mounted {
                mount: entry.name().to_string(),
                response,
            }),
            Err(e) => {
                tracing::warn!(
                    mount = %entry.name(),
                    request_id = ctx.request_id().unwrap_or("-"),
                    error = %e,
                    "Mounted request failed"
                );
                Err(e.into())
            }
        }
    }
}

fn outcome_label(result: &Result<Response, BridgeError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(BridgeError::Scope { .. }) => "scope_error",
        Err(BridgeError::Pipeline { .. }) => "pipeline_error",
        Err(BridgeError::Cancelled { .. }) => "cancelled",
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mounts", &self.mounts)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}
