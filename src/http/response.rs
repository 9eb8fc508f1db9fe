//! Mapping dispatch failures to client responses.
//!
//! # Design Decisions
//! - Scope creation failure → 503 (the mount cannot serve right now)
//! - Pipeline or fallback failure → 500
//! - Cancelled request → 503
//! - Error details go to the log, not to the client

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::bridge::BridgeError;
use crate::dispatch::DispatchError;

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Mount(BridgeError::Scope { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Mount(BridgeError::Cancelled { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Mount(BridgeError::Pipeline { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Fallback(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            DispatchError::Mount(BridgeError::Scope { .. }) => "Mounted application unavailable",
            DispatchError::Mount(BridgeError::Cancelled { .. }) => "Request cancelled",
            DispatchError::Mount(BridgeError::Pipeline { .. }) => "Mounted application failed",
            DispatchError::Fallback(_) => "Request failed",
        };
        (status, message).into_response()
    }
}
