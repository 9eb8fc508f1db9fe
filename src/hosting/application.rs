//! Building and starting a mounted application.
//!
//! # Data Flow
//! ```text
//! AppBuilder::new(name)
//!     → services()    (singletons + scoped factories)
//!     → route/router  (axum routes, the app's own middleware)
//!     → on_startup    (hooks run once the app starts)
//!     → build()       → Application
//!
//! Application::start(server, token)
//!     → server.start  (NullListener: no socket)
//!     → startup hooks, in registration order
//!     → Running: pipeline() + scope_factory() ready for mounting
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use axum::routing::MethodRouter;
use axum::Router;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::hosting::pipeline::{BoxError, Pipeline, ScopeFactory};
use crate::hosting::router_pipeline::RouterPipeline;
use crate::hosting::services::{ServiceCollection, ServiceProvider};
use crate::net::{Server, ServerError};

/// Default limit for bodies read through a mounted router.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

type StartupHook = Box<dyn Fn(ServiceProvider) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Built,
    Starting,
    Running,
    Failed,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("application `{name}` cannot start from state {state:?}")]
    InvalidState { name: String, state: AppState },

    #[error("server for application `{name}` failed: {source}")]
    Server {
        name: String,
        #[source]
        source: ServerError,
    },

    #[error("startup hook #{index} of application `{name}` failed: {source}")]
    StartupHook {
        name: String,
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("startup of application `{name}` was cancelled")]
    Cancelled { name: String },
}

/// Collects everything one application needs before it is built.
pub struct AppBuilder {
    name: String,
    services: ServiceCollection,
    router: Router,
    startup_hooks: Vec<StartupHook>,
    body_limit: usize,
}

impl AppBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: ServiceCollection::new(),
            router: Router::new(),
            startup_hooks: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn services(&mut self) -> &mut ServiceCollection {
        &mut self.services
    }

    pub fn with_services(mut self, configure: impl FnOnce(&mut ServiceCollection)) -> Self {
        configure(&mut self.services);
        self
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Merge a prepared router (routes, layers, fallback) into the app.
    pub fn router(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Run `hook` once when the application starts.
    pub fn on_startup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ServiceProvider) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.startup_hooks
            .push(Box::new(move |provider| Box::pin(hook(provider))));
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn build(self) -> Application {
        let provider = self.services.build_provider(self.name.clone());
        let pipeline = RouterPipeline::new(self.name.clone(), self.router, self.body_limit);

        Application {
            name: self.name,
            provider,
            pipeline: Arc::new(pipeline),
            startup_hooks: self.startup_hooks,
            state: Mutex::new(AppState::Built),
        }
    }
}

/// A built application: its pipeline plus its service container.
pub struct Application {
    name: String,
    provider: ServiceProvider,
    pipeline: Arc<RouterPipeline>,
    startup_hooks: Vec<StartupHook>,
    state: Mutex<AppState>,
}

impl Application {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.provider
    }

    /// The request pipeline built from the app's router.
    pub fn pipeline(&self) -> Arc<dyn Pipeline> {
        self.pipeline.clone()
    }

    /// Creates one isolated scope per request.
    pub fn scope_factory(&self) -> Arc<dyn ScopeFactory> {
        Arc::new(self.provider.clone())
    }

    pub fn state(&self) -> AppState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: AppState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Start the server, then run startup hooks in order.
    pub async fn start(
        &self,
        server: &dyn Server,
        token: &CancellationToken,
    ) -> Result<(), ApplicationError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != AppState::Built {
                return Err(ApplicationError::InvalidState {
                    name: self.name.clone(),
                    state: *state,
                });
            }
            *state = AppState::Starting;
        }

        let result = self.run_startup(server, token).await;
        match &result {
            Ok(()) => {
                self.set_state(AppState::Running);
                tracing::info!(app = %self.name, hooks = self.startup_hooks.len(), "Application started");
            }
            Err(e) => {
                self.set_state(AppState::Failed);
                tracing::error!(app = %self.name, error = %e, "Application failed to start");
            }
        }
        result
    }

    async fn run_startup(
        &self,
        server: &dyn Server,
        token: &CancellationToken,
    ) -> Result<(), ApplicationError> {
        server
            .start(self, token)
            .await
            .map_err(|source| ApplicationError::Server {
                name: self.name.clone(),
                source,
            })?;

        for (index, hook) in self.startup_hooks.iter().enumerate() {
            if token.is_cancelled() {
                return Err(ApplicationError::Cancelled {
                    name: self.name.clone(),
                });
            }
            hook(self.provider.clone())
                .await
                .map_err(|source| ApplicationError::StartupHook {
                    name: self.name.clone(),
                    index,
                    source,
                })?;
        }
        Ok(())
    }

    /// Stop the server and refuse new scopes. Scopes in flight finish normally.
    pub async fn stop(
        &self,
        server: &dyn Server,
        token: &CancellationToken,
    ) -> Result<(), ApplicationError> {
        self.provider.close();
        self.set_state(AppState::Stopped);
        server
            .stop(token)
            .await
            .map_err(|source| ApplicationError::Server {
                name: self.name.clone(),
                source,
            })?;
        tracing::info!(app = %self.name, "Application stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("provider", &self.provider)
            .finish()
    }
}
