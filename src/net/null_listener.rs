//! A server that never listens.
//!
//! Lets a mounted application run its full startup lifecycle (and its
//! startup hooks) without binding a socket. Requests reach it only through
//! the front door's dispatcher.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::hosting::Application;
use crate::net::server::{Server, ServerError, ServerFeatures};

#[derive(Debug, Default)]
pub struct NullListener {
    features: ServerFeatures,
}

impl NullListener {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Server for NullListener {
    async fn start(&self, app: &Application, _token: &CancellationToken) -> Result<(), ServerError> {
        tracing::debug!(app = %app.name(), "Null listener started (no socket bound)");
        Ok(())
    }

    async fn stop(&self, _token: &CancellationToken) -> Result<(), ServerError> {
        Ok(())
    }

    fn features(&self) -> &ServerFeatures {
        &self.features
    }
}
