//! Pipelines for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::context::RequestContext;
use crate::hosting::{Fallback, Pipeline, PipelineError, Scope};

/// What a pipeline saw when it was invoked.
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub path_base: String,
    pub query_string: Option<String>,
}

/// Answers every request with its name and records what it saw.
#[derive(Debug)]
pub struct StaticPipeline {
    name: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<Seen>>,
    fail: bool,
}

impl StaticPipeline {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(Seen {
            path: ctx.path.clone(),
            path_base: ctx.path_base.clone(),
            query_string: ctx.query_string.clone(),
        });
        ctx.route_values.insert("handled_by", self.name.clone());

        if self.fail {
            return Err(PipelineError::handler(format!("{} exploded", self.name)));
        }
        Ok(self.name.clone().into_response())
    }
}

#[async_trait]
impl Pipeline for StaticPipeline {
    async fn handle(
        &self,
        ctx: &mut RequestContext,
        _scope: &Scope,
    ) -> Result<Response, PipelineError> {
        self.record(ctx)
    }
}

#[async_trait]
impl Fallback for StaticPipeline {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        self.record(ctx)
    }
}
