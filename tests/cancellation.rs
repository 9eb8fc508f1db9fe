//! Request cancellation through the front door.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Extension;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use mount_host::bridge::{BridgeError, BridgeStrategy};
use mount_host::config::HostConfig;
use mount_host::dispatch::DispatchError;
use mount_host::hosting::AppBuilder;
use mount_host::lifecycle::Host;

mod common;
use common::{context, host_config, start_host};

/// `app1` with routes that hand their request token back to the test.
fn watched_app(entered: mpsc::UnboundedSender<CancellationToken>) -> AppBuilder {
    let quick = entered.clone();
    AppBuilder::new("app1")
        .route(
            "/stream",
            get(|Extension(token): Extension<CancellationToken>| async move {
                Body::from_stream(stream::once(async move {
                    let outcome = tokio::select! {
                        _ = token.cancelled() => "cancelled",
                        _ = tokio::time::sleep(Duration::from_millis(100)) => "completed",
                    };
                    Ok::<_, Infallible>(outcome)
                }))
            }),
        )
        .route(
            "/quick",
            get(move |Extension(token): Extension<CancellationToken>| {
                let entered = quick.clone();
                async move {
                    let _ = entered.send(token);
                    "ok"
                }
            }),
        )
        .route(
            "/slow",
            get(move |Extension(token): Extension<CancellationToken>| {
                let entered = entered.clone();
                async move {
                    let _ = entered.send(token);
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "too late"
                }
            }),
        )
}

async fn watched_host(config: HostConfig) -> (Host, mpsc::UnboundedReceiver<CancellationToken>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (start_host(config, vec![watched_app(tx)]).await, rx)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_streamed_response_outlives_handler_return() {
    let (host, _rx) = watched_host(host_config(&[("app1", "/app1")], BridgeStrategy::Alias)).await;

    let response = host.router().oneshot(get_request("/app1/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(bytes, "completed");
}

#[tokio::test]
async fn test_completed_request_leaves_token_live() {
    let (host, mut rx) = watched_host(host_config(&[("app1", "/app1")], BridgeStrategy::Alias)).await;

    let response = host.router().oneshot(get_request("/app1/quick")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = rx.recv().await.unwrap();
    assert!(!token.is_cancelled());
    assert_eq!(host.applications()[0].services().stats().active(), 0);
}

#[tokio::test]
async fn test_dropped_request_cancels_token_and_releases_scope() {
    let (host, mut rx) = watched_host(host_config(&[("app1", "/app1")], BridgeStrategy::Alias)).await;

    let in_flight = tokio::spawn(host.router().oneshot(get_request("/app1/slow")));
    let token = rx.recv().await.unwrap();
    assert!(!token.is_cancelled());
    assert_eq!(host.applications()[0].services().stats().active(), 1);

    in_flight.abort();
    assert!(in_flight.await.unwrap_err().is_cancelled());

    assert!(token.is_cancelled());
    assert_eq!(host.applications()[0].services().stats().active(), 0);
}

#[tokio::test]
async fn test_timed_out_request_cancels_token_and_releases_scope() {
    let mut config = host_config(&[("app1", "/app1")], BridgeStrategy::Alias);
    config.timeouts.request_secs = 1;
    let (host, mut rx) = watched_host(config).await;

    let response = host.router().oneshot(get_request("/app1/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let token = rx.recv().await.unwrap();
    assert!(token.is_cancelled());
    assert_eq!(host.applications()[0].services().stats().active(), 0);
}

#[tokio::test]
async fn test_cancelled_forward_is_reported_and_releases_scope() {
    for strategy in [BridgeStrategy::Alias, BridgeStrategy::Clone] {
        let (host, mut rx) = watched_host(host_config(&[("app1", "/app1")], strategy)).await;

        let canceller = tokio::spawn(async move {
            if let Some(token) = rx.recv().await {
                token.cancel();
            }
        });

        let mut ctx = context("/app1/slow");
        let err = host.dispatcher().dispatch(&mut ctx).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(
            err,
            DispatchError::Mount(BridgeError::Cancelled { ref mount }) if mount == "app1"
        ));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(host.applications()[0].services().stats().active(), 0);
    }
}
