//! Dispatch behavior through a started host.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use mount_host::bridge::{BridgeError, BridgeStrategy, ContextBridge};
use mount_host::context::RequestContext;
use mount_host::dispatch::{DispatchError, Dispatcher};
use mount_host::hosting::{
    AppBuilder, Pipeline, PipelineError, RouterPipeline, Scope, ScopeStats, ServiceCollection,
    ServiceProvider,
};
use mount_host::routing::MountRegistry;

mod common;
use common::{body_json, context, host_config, probe_app, start_host};

fn drops() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[tokio::test]
async fn test_disjoint_mounts_reach_their_apps() {
    let host = start_host(
        host_config(&[("app1", "/app1"), ("app2", "/app2")], BridgeStrategy::Alias),
        vec![probe_app("app1", drops()), probe_app("app2", drops())],
    )
    .await;
    let dispatcher = host.dispatcher();

    let mut ctx = context("/app1");
    let outcome = dispatcher.dispatch(&mut ctx).await.unwrap();
    assert_eq!(outcome.mount(), Some("app1"));
    let seen = body_json(outcome.into_response()).await;
    assert_eq!(seen["app"], "app1");
    assert_eq!(seen["path"], "/");
    assert_eq!(seen["path_base"], "/app1");

    let mut ctx = context("/app2/x");
    let seen = body_json(dispatcher.dispatch(&mut ctx).await.unwrap().into_response()).await;
    assert_eq!(seen["app"], "app2");
    assert_eq!(seen["path"], "/x");

    let mut ctx = context("/");
    let outcome = dispatcher.dispatch(&mut ctx).await.unwrap();
    assert!(!outcome.handled());
    assert_eq!(body_json(outcome.into_response()).await["app"], "fallback");
}

#[tokio::test]
async fn test_prefix_matches_whole_segments_only() {
    let host = start_host(
        host_config(&[("app1", "/app1")], BridgeStrategy::Alias),
        vec![probe_app("app1", drops())],
    )
    .await;

    let mut ctx = context("/app10/x");
    let outcome = host.dispatcher().dispatch(&mut ctx).await.unwrap();
    assert!(!outcome.handled());

    let seen = body_json(outcome.into_response()).await;
    assert_eq!(seen["app"], "fallback");
    assert_eq!(seen["path"], "/app10/x");
    assert_eq!(seen["path_base"], "");
}

#[tokio::test]
async fn test_first_registered_mount_wins() {
    let host = start_host(
        host_config(&[("outer", "/api"), ("inner", "/api/v2")], BridgeStrategy::Alias),
        vec![probe_app("outer", drops()), probe_app("inner", drops())],
    )
    .await;
    let mut ctx = context("/api/v2/users");
    let seen = body_json(host.dispatcher().dispatch(&mut ctx).await.unwrap().into_response()).await;
    assert_eq!(seen["app"], "outer");
    assert_eq!(seen["path"], "/v2/users");

    let host = start_host(
        host_config(&[("inner", "/api/v2"), ("outer", "/api")], BridgeStrategy::Alias),
        vec![probe_app("outer", drops()), probe_app("inner", drops())],
    )
    .await;
    let mut ctx = context("/api/v2/users");
    let seen = body_json(host.dispatcher().dispatch(&mut ctx).await.unwrap().into_response()).await;
    assert_eq!(seen["app"], "inner");
    assert_eq!(seen["path"], "/users");
    assert_eq!(seen["path_base"], "/api/v2");
}

#[tokio::test]
async fn test_hit_rewrites_path_and_keeps_query() {
    let host = start_host(
        host_config(&[("app1", "/app1")], BridgeStrategy::Alias),
        vec![probe_app("app1", drops())],
    )
    .await;

    let mut ctx = context("/app1/foo?q=1");
    let seen = body_json(host.dispatcher().dispatch(&mut ctx).await.unwrap().into_response()).await;
    assert_eq!(seen["path"], "/foo");
    assert_eq!(seen["query"], "q=1");
    assert_eq!(seen["path_base"], "/app1");

    // The caller's context carries the rewrite too.
    assert_eq!(ctx.path, "/foo");
    assert_eq!(ctx.path_base, "/app1");
    assert_eq!(ctx.query.get("q"), Some("1"));
    assert_eq!(ctx.raw_target, "/app1/foo?q=1");
}

#[tokio::test]
async fn test_prefix_match_ignores_ascii_case() {
    let host = start_host(
        host_config(&[("app1", "/app1")], BridgeStrategy::Alias),
        vec![probe_app("app1", drops())],
    )
    .await;

    let mut ctx = context("/APP1/Foo");
    let seen = body_json(host.dispatcher().dispatch(&mut ctx).await.unwrap().into_response()).await;
    assert_eq!(seen["app"], "app1");
    assert_eq!(seen["path"], "/Foo");
    assert_eq!(seen["path_base"], "/app1");
}

#[tokio::test]
async fn test_clone_keeps_multi_valued_headers() {
    let host = start_host(
        host_config(&[("app1", "/app1")], BridgeStrategy::Clone),
        vec![probe_app("app1", drops())],
    )
    .await;

    let mut ctx = context("/app1/x");
    ctx.headers.append("x-tenant", HeaderValue::from_static("acme"));
    ctx.headers.append("x-tenant", HeaderValue::from_static("globex"));

    let seen = body_json(host.dispatcher().dispatch(&mut ctx).await.unwrap().into_response()).await;
    assert_eq!(seen["tenants"], serde_json::json!(["acme", "globex"]));
}

#[tokio::test]
async fn test_fallback_sees_context_unmodified() {
    let host = start_host(
        host_config(&[("app1", "/app1")], BridgeStrategy::Alias),
        vec![probe_app("app1", drops())],
    )
    .await;

    let mut ctx = context("/other/page?x=2");
    let outcome = host.dispatcher().dispatch(&mut ctx).await.unwrap();
    assert_eq!(ctx.path, "/other/page");
    assert_eq!(ctx.path_base, "");

    let seen = body_json(outcome.into_response()).await;
    assert_eq!(seen["path"], "/other/page");
    assert_eq!(seen["query"], "x=2");
    assert!(seen["scope_id"].is_null());
}

#[tokio::test]
async fn test_every_scope_is_released() {
    let dropped = drops();
    let host = start_host(
        host_config(&[("app1", "/app1")], BridgeStrategy::Alias),
        vec![probe_app("app1", dropped.clone())],
    )
    .await;

    let mut scope_ids = Vec::new();
    for _ in 0..3 {
        let mut ctx = context("/app1/x");
        let seen = body_json(host.dispatcher().dispatch(&mut ctx).await.unwrap().into_response()).await;
        scope_ids.push(seen["scope_id"].as_str().unwrap().to_string());
    }
    let unique: HashSet<_> = scope_ids.iter().collect();
    assert_eq!(unique.len(), 3);

    let stats = host.applications()[0].services().stats();
    assert_eq!(stats, ScopeStats { created: 3, released: 3 });
    assert_eq!(dropped.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_scope_factory_failure_fails_only_that_mount() {
    let broken = AppBuilder::new("broken").with_services(|services| {
        services.add_scoped::<String, _>(|_| Err("connection refused".into()));
    });
    let host = start_host(
        host_config(&[("broken", "/broken"), ("app1", "/app1")], BridgeStrategy::Alias),
        vec![broken, probe_app("app1", drops())],
    )
    .await;

    let mut ctx = context("/broken/x");
    let err = host.dispatcher().dispatch(&mut ctx).await.unwrap_err();
    assert!(matches!(err, DispatchError::Mount(BridgeError::Scope { .. })));
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

    let mut ctx = context("/app1/x");
    assert!(host.dispatcher().dispatch(&mut ctx).await.is_ok());
}

/// Pipeline that edits the context it is given, then optionally fails.
struct Mutating {
    fail: bool,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl Pipeline for Mutating {
    async fn handle(&self, ctx: &mut RequestContext, scope: &Scope) -> Result<Response, PipelineError> {
        let released = self.released.clone();
        scope.on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        });

        ctx.headers.insert("x-mounted", HeaderValue::from_static("yes"));
        ctx.route_values.insert("handled_by", "mutating");

        if self.fail {
            Err(PipelineError::handler("handler exploded"))
        } else {
            Ok("mutated".into_response())
        }
    }
}

fn mutating_dispatcher(
    strategy: BridgeStrategy,
    fail: bool,
) -> (Dispatcher, Arc<AtomicUsize>, ServiceProvider) {
    let released = Arc::new(AtomicUsize::new(0));
    let provider = ServiceCollection::new().build_provider("mut");
    let mut registry = MountRegistry::new();
    registry
        .register(
            "mut",
            "/mut",
            Arc::new(Mutating {
                fail,
                released: released.clone(),
            }),
            Arc::new(provider.clone()),
        )
        .unwrap();
    let fallback = RouterPipeline::new("fallback", Router::new(), 1024);
    let dispatcher = Dispatcher::new(Arc::new(registry), ContextBridge::new(strategy), Arc::new(fallback));
    (dispatcher, released, provider)
}

#[tokio::test]
async fn test_alias_exposes_pipeline_edits_to_caller() {
    let (dispatcher, _, _) = mutating_dispatcher(BridgeStrategy::Alias, false);
    let mut ctx = context("/mut/x");
    dispatcher.dispatch(&mut ctx).await.unwrap();

    assert_eq!(ctx.headers["x-mounted"], "yes");
    assert_eq!(ctx.route_values.get("handled_by"), Some("mutating"));
}

#[tokio::test]
async fn test_clone_isolates_caller_from_pipeline_edits() {
    let (dispatcher, _, _) = mutating_dispatcher(BridgeStrategy::Clone, false);
    let mut ctx = context("/mut/x");
    dispatcher.dispatch(&mut ctx).await.unwrap();

    assert!(!ctx.headers.contains_key("x-mounted"));
    assert!(ctx.route_values.get("handled_by").is_none());
    // The rebase happens before the copy.
    assert_eq!(ctx.path_base, "/mut");
}

#[tokio::test]
async fn test_pipeline_failure_releases_scope_and_propagates() {
    for strategy in [BridgeStrategy::Alias, BridgeStrategy::Clone] {
        let (dispatcher, released, provider) = mutating_dispatcher(strategy, true);
        let mut ctx = context("/mut/x");

        let err = dispatcher.dispatch(&mut ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::Mount(BridgeError::Pipeline { .. })));
        assert!(err.to_string().contains("handler exploded"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(provider.stats().active(), 0);
    }
}
