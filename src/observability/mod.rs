//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / bridge / scopes produce:
//!     → logging.rs (structured log events, request ID and scope ID fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
