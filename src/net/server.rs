//! Server lifecycle contract.
//!
//! An application is started against a `Server`. The front door owns the
//! only real socket; mounted applications run against a [`NullListener`].
//!
//! [`NullListener`]: crate::net::NullListener

use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::hosting::Application;

/// Error type for server lifecycle operations.
///
/// `NullListener` never fails; socket-backed `Server` implementations
/// report bind failures through `Bind`.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    Bind(#[source] std::io::Error),
}

/// Capabilities a server exposes to the application it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFeatures {
    /// Addresses the server listens on. Empty for a `NullListener`.
    pub addresses: Vec<SocketAddr>,
}

impl ServerFeatures {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[async_trait]
pub trait Server: Send + Sync {
    async fn start(&self, app: &Application, token: &CancellationToken) -> Result<(), ServerError>;

    async fn stop(&self, token: &CancellationToken) -> Result<(), ServerError>;

    fn features(&self) -> &ServerFeatures;
}
