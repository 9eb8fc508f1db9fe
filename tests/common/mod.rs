//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use mount_host::bridge::BridgeStrategy;
use mount_host::config::{HostConfig, MountConfig};
use mount_host::context::{PathBase, RequestContext, RouteValues};
use mount_host::hosting::{AppBuilder, ScopedServices};
use mount_host::lifecycle::{Host, HostBuilder, Shutdown};

/// Host config with the given mounts, in order.
pub fn host_config(mounts: &[(&str, &str)], strategy: BridgeStrategy) -> HostConfig {
    let mut config = HostConfig::default();
    config.bridge.strategy = strategy;
    config.mounts = mounts
        .iter()
        .map(|(name, prefix)| MountConfig::new(*name, *prefix))
        .collect();
    config
}

/// Scoped service that counts how many instances were dropped.
pub struct Tracked {
    drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Describe what a handler saw, as JSON.
fn describe(app: &'static str, request: &Request<Body>) -> Value {
    let tenants: Vec<&str> = request
        .headers()
        .get_all("x-tenant")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let extensions = request.extensions();
    json!({
        "app": app,
        "path": request.uri().path(),
        "query": request.uri().query(),
        "path_base": extensions.get::<PathBase>().map(|b| b.0.clone()),
        "tenants": tenants,
        "route_tenant": extensions.get::<RouteValues>().and_then(|v| v.get("tenant")),
        "scope_id": extensions.get::<ScopedServices>().map(|s| s.scope_id().to_string()),
    })
}

fn probe_router(app: &'static str) -> Router {
    let handler = move |request: Request<Body>| async move { Json(describe(app, &request)) };
    Router::new()
        .route("/", get(handler))
        .route("/{*rest}", get(handler))
}

/// Application that echoes what it saw and builds a `Tracked` per scope.
pub fn probe_app(app: &'static str, drops: Arc<AtomicUsize>) -> AppBuilder {
    AppBuilder::new(app)
        .with_services(move |services| {
            services.add_scoped(move |_| {
                Ok(Tracked {
                    drops: drops.clone(),
                })
            });
        })
        .router(probe_router(app))
}

/// Start a host whose fallback is a probe named `fallback`.
pub async fn start_host(config: HostConfig, apps: Vec<AppBuilder>) -> Host {
    let mut builder = HostBuilder::new(config).fallback(probe_router("fallback"));
    for app in apps {
        builder = builder.mount(app);
    }
    builder.start(&Shutdown::new()).await.unwrap()
}

pub fn context(uri: &str) -> RequestContext {
    RequestContext::from_request(Request::builder().uri(uri).body(Body::empty()).unwrap())
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
