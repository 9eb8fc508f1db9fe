//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the front-door Axum Router with a single catch-all handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener, drain on shutdown
//! - Hand every request to the dispatcher

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// Application state injected into the front-door handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// The process's single HTTP listener.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, timeouts: &TimeoutConfig) -> Self {
        let state = AppState { dispatcher };
        let router = Self::build_router(Duration::from_secs(timeouts.request_secs), state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(front_door))
            .route("/", any(front_door))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the front door in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: one inbound request, one dispatch.
async fn front_door(State(state): State<AppState>, request: Request<Body>) -> Response {
    let mut ctx = RequestContext::from_request(request);

    // Fires only if this future is dropped (client went away, timeout layer).
    let abandoned = ctx.cancellation.clone().drop_guard();
    let result = state.dispatcher.dispatch(&mut ctx).await;
    abandoned.disarm();

    match result {
        Ok(outcome) => outcome.into_response(),
        Err(e) => {
            tracing::error!(
                request_id = ctx.request_id().unwrap_or("-"),
                path_base = %ctx.path_base,
                path = %ctx.path,
                error = %e,
                "Dispatch failed"
            );
            e.into_response()
        }
    }
}
