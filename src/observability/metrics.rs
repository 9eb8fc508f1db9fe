//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mount_host_requests_total` (counter): dispatches by mount, outcome
//! - `mount_host_dispatch_duration_seconds` (histogram): dispatch latency by mount
//! - `mount_host_scopes_active` (gauge): request scopes currently alive, by app
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Fallback requests are labelled `mount="fallback"`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Mount label used for requests no mount claimed.
pub const FALLBACK_LABEL: &str = "fallback";

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_dispatch(mount: &str, outcome: &'static str, start: Instant) {
    counter!(
        "mount_host_requests_total",
        "mount" => mount.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("mount_host_dispatch_duration_seconds", "mount" => mount.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn scope_opened(app: &str) {
    gauge!("mount_host_scopes_active", "app" => app.to_string()).increment(1.0);
}

pub fn scope_released(app: &str) {
    gauge!("mount_host_scopes_active", "app" => app.to_string()).decrement(1.0);
}
