//! `axum::Router` as a mounted pipeline.
//!
//! Renders the bridged context into a `Request<Body>` and drives the router
//! with `oneshot`. Handlers see the rewritten path and can extract
//! `Extension<PathBase>`, `Extension<RouteValues>`, `Extension<RequestBody>`,
//! `Extension<CancellationToken>` and, for mounted apps,
//! `Extension<ScopedServices>`.

use async_trait::async_trait;
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use crate::context::RequestContext;
use crate::hosting::pipeline::{Fallback, Pipeline, PipelineError};
use crate::hosting::services::Scope;

#[derive(Clone)]
pub struct RouterPipeline {
    name: String,
    router: Router,
    body_limit: usize,
}

impl RouterPipeline {
    pub fn new(name: impl Into<String>, router: Router, body_limit: usize) -> Self {
        Self {
            name: name.into(),
            router,
            body_limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        scope: Option<&Scope>,
    ) -> Result<Response, PipelineError> {
        let mut request = ctx.render_request(self.body_limit)?;
        if let Some(scope) = scope {
            request.extensions_mut().insert(scope.services().clone());
        }

        match self.router.clone().oneshot(request).await {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }
}

#[async_trait]
impl Pipeline for RouterPipeline {
    async fn handle(
        &self,
        ctx: &mut RequestContext,
        scope: &Scope,
    ) -> Result<Response, PipelineError> {
        tracing::debug!(
            app = %self.name,
            path = %ctx.path,
            path_base = %ctx.path_base,
            scope_id = %scope.id(),
            "Invoking mounted pipeline"
        );
        self.call(ctx, Some(scope)).await
    }
}

#[async_trait]
impl Fallback for RouterPipeline {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        tracing::debug!(app = %self.name, path = %ctx.path, "Invoking fallback pipeline");
        self.call(ctx, None).await
    }
}

impl std::fmt::Debug for RouterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterPipeline")
            .field("name", &self.name)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}
