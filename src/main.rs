//! Mount host
//!
//! Serves several HTTP applications from one listener, each under its own
//! path prefix.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (front door, request id, trace, timeout)
//!                         │
//!                         ▼
//!                     dispatch::Dispatcher ── miss ──▶ fallback pipeline
//!                         │ hit (routing::MountRegistry, first match)
//!                         ▼
//!                     rebase path / path_base
//!                         │
//!                         ▼
//!                     bridge::ContextBridge (alias | clone)
//!                         │  ScopeFactory::create_scope
//!                         ▼
//!                     mounted Pipeline (the app's own axum Router)
//!                         │  Scope dropped → released
//!                         ▼
//!     Client Response ◀───┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::Extension;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tokio::net::TcpListener;

use mount_host::bridge::BridgeStrategy;
use mount_host::config::{load_config, HostConfig, MountConfig};
use mount_host::context::PathBase;
use mount_host::hosting::{AppBuilder, ScopedServices};
use mount_host::lifecycle::signals::spawn_signal_listener;
use mount_host::lifecycle::{HostBuilder, Shutdown};
use mount_host::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "mount-host")]
#[command(about = "Serve several HTTP applications from one listener", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `bridge.strategy` (alias or clone).
    #[arg(short, long)]
    strategy: Option<BridgeStrategy>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HostConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(strategy) = cli.strategy {
        config.bridge.strategy = strategy;
    }
    if config.mounts.is_empty() {
        config.mounts = vec![
            MountConfig::new("app1", "/app1"),
            MountConfig::new("app2", "/app2"),
        ];
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("mount-host v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let mut builder = HostBuilder::new(config.clone()).fallback(fallback());
    for mount in &config.mounts {
        match demo_app(&mount.name) {
            Some(app) => builder = builder.mount(app),
            None => tracing::warn!(mount = %mount.name, "No built-in application with this name"),
        }
    }
    let host = builder.start(&shutdown).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        strategy = %config.bridge.strategy,
        "Listening for connections"
    );

    host.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

struct Visits(AtomicU64);

struct RequestSerial(u64);

fn demo_app(name: &str) -> Option<AppBuilder> {
    match name {
        "app1" => Some(
            AppBuilder::new("app1")
                .with_services(|services| {
                    services
                        .add_singleton(Visits(AtomicU64::new(0)))
                        .add_scoped(|provider| {
                            let visits = provider.get::<Visits>().ok_or("visit counter missing")?;
                            Ok(RequestSerial(visits.0.fetch_add(1, Ordering::Relaxed) + 1))
                        });
                })
                .route("/", get(|| async { "Hello App1!" }))
                .route(
                    "/visits",
                    get(|Extension(services): Extension<ScopedServices>| async move {
                        let serial = services.get::<RequestSerial>().map_or(0, |s| s.0);
                        format!("visit #{serial}")
                    }),
                )
                .route("/whoami", get(whoami)),
        ),
        "app2" => Some(
            AppBuilder::new("app2")
                .route("/", get(|| async { "Hello App2!" }))
                .route("/whoami", get(whoami)),
        ),
        _ => None,
    }
}

async fn whoami(
    Extension(base): Extension<PathBase>,
    uri: axum::http::Uri,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "path_base": base.0,
        "path": uri.path(),
        "query": uri.query(),
    }))
}

fn fallback() -> Router {
    Router::new().route("/", get(|| async { "Hello World!" }))
}
