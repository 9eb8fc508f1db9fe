//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the mount table before anything is built
//! - Build and start every mounted application on a null listener
//! - Register mounts in configuration order and assemble the dispatcher
//! - Bind the front door last, stop applications after it drains
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, already-started apps are stopped
//! - Applications start one after another, not concurrently
//! - Listeners start last (traffic only when ready)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::bridge::ContextBridge;
use crate::config::validation::validate_config;
use crate::config::{HostConfig, ValidationError};
use crate::dispatch::Dispatcher;
use crate::hosting::{AppBuilder, Application, ApplicationError, RouterPipeline};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::NullListener;
use crate::routing::{MountError, MountRegistry};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("mount `{0}` has no application")]
    MissingApplication(String),

    #[error("application `{0}` is not mounted")]
    UnmountedApplication(String),

    #[error("application `{0}` was supplied twice")]
    DuplicateApplication(String),

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("front door failed: {0}")]
    Serve(#[source] std::io::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects the applications and the fallback for one host process.
pub struct HostBuilder {
    config: HostConfig,
    apps: Vec<AppBuilder>,
    fallback: Router,
}

impl HostBuilder {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            apps: Vec::new(),
            fallback: Router::new(),
        }
    }

    /// Supply the application for the mount named `app.name()`.
    pub fn mount(mut self, app: AppBuilder) -> Self {
        self.apps.push(app);
        self
    }

    /// Router that handles requests no mount matches.
    pub fn fallback(mut self, router: Router) -> Self {
        self.fallback = router;
        self
    }

    /// Build and start every application, then assemble the dispatcher.
    pub async fn start(self, shutdown: &Shutdown) -> Result<Host, StartupError> {
        validate_config(&self.config).map_err(StartupError::Validation)?;

        let mut supplied: HashMap<String, AppBuilder> = HashMap::new();
        for app in self.apps {
            let name = app.name().to_string();
            if supplied.insert(name.clone(), app).is_some() {
                return Err(StartupError::DuplicateApplication(name));
            }
        }

        let mut ordered = Vec::with_capacity(self.config.mounts.len());
        for mount in &self.config.mounts {
            let app = supplied
                .remove(&mount.name)
                .ok_or_else(|| StartupError::MissingApplication(mount.name.clone()))?;
            ordered.push((mount, app));
        }
        if let Some(name) = supplied.into_keys().next() {
            return Err(StartupError::UnmountedApplication(name));
        }

        let listener = NullListener::new();
        let token = shutdown.token();
        let mut started: Vec<Arc<Application>> = Vec::with_capacity(ordered.len());
        let mut registry = MountRegistry::new();

        for (mount, builder) in ordered {
            let app = Arc::new(builder.body_limit(self.config.bridge.max_body_bytes).build());
            let result = match app.start(&listener, &token).await {
                Ok(()) => registry
                    .register(&mount.name, &mount.path_prefix, app.pipeline(), app.scope_factory())
                    .map(|_| ())
                    .map_err(StartupError::from),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                stop_all(&started, &listener, &token).await;
                return Err(e);
            }

            tracing::info!(
                app = %mount.name,
                path_prefix = %mount.path_prefix,
                "Application mounted"
            );
            started.push(app);
        }

        let fallback = RouterPipeline::new("fallback", self.fallback, self.config.bridge.max_body_bytes);
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            ContextBridge::new(self.config.bridge.strategy),
            Arc::new(fallback),
        );

        tracing::info!(
            mounts = started.len(),
            strategy = %self.config.bridge.strategy,
            "Host ready"
        );

        Ok(Host {
            config: self.config,
            dispatcher: Arc::new(dispatcher),
            apps: started,
            listener,
        })
    }
}

/// A started host: mounted applications behind one dispatcher.
pub struct Host {
    config: HostConfig,
    dispatcher: Arc<Dispatcher>,
    apps: Vec<Arc<Application>>,
    listener: NullListener,
}

impl Host {
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn applications(&self) -> &[Arc<Application>] {
        &self.apps
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The layered front-door router, for serving in-process.
    pub fn router(&self) -> Router {
        HttpServer::new(self.dispatcher.clone(), &self.config.timeouts).router()
    }

    /// Serve on `listener` until shutdown, then stop every application.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        let server = HttpServer::new(self.dispatcher.clone(), &self.config.timeouts);
        let served = server.run(listener, shutdown.token()).await;
        self.stop().await;
        served.map_err(StartupError::Serve)
    }

    /// Stop every application within the configured shutdown deadline.
    pub async fn stop(&self) {
        let deadline = Duration::from_secs(self.config.timeouts.shutdown_secs);
        let token = tokio_util::sync::CancellationToken::new();
        if tokio::time::timeout(deadline, stop_all(&self.apps, &self.listener, &token))
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_secs = self.config.timeouts.shutdown_secs,
                "Shutdown deadline exceeded while stopping applications"
            );
        }
    }
}

async fn stop_all(
    apps: &[Arc<Application>],
    listener: &NullListener,
    token: &tokio_util::sync::CancellationToken,
) {
    for app in apps.iter().rev() {
        if let Err(e) = app.stop(listener, token).await {
            tracing::error!(app = %app.name(), error = %e, "Failed to stop application");
        }
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("dispatcher", &self.dispatcher)
            .field("apps", &self.apps)
            .finish_non_exhaustive()
    }
}
