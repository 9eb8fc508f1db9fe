//! Lazily-read request body.
//!
//! The body is a capability, not a value: nothing is read until a consumer
//! asks for the bytes or the stream. Handles are cheap to clone and share the
//! same underlying state.
//!
//! ```text
//! Pending ──bytes()──▶ Buffered ──bytes()──▶ Buffered (cached)
//!    │
//!    └──into_stream()──▶ Streaming ──any read──▶ AlreadyConsumed
//! ```

use std::sync::Arc;

use axum::body::{Body, Bytes};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors surfaced when reading a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The stream was handed out earlier; there is no body left to read.
    #[error("request body was already consumed")]
    AlreadyConsumed,

    #[error("request body is not form encoded")]
    NotForm,

    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),
}

enum BodyState {
    Empty,
    Pending(Body),
    Buffered(Bytes),
    Streaming,
}

/// Shared handle over a request body.
#[derive(Clone)]
pub struct RequestBody {
    state: Arc<Mutex<BodyState>>,
}

impl RequestBody {
    /// Wrap an unread body stream.
    pub fn new(body: Body) -> Self {
        Self::with_state(BodyState::Pending(body))
    }

    pub fn empty() -> Self {
        Self::with_state(BodyState::Empty)
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::with_state(BodyState::Buffered(bytes.into()))
    }

    fn with_state(state: BodyState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Read the whole body, caching it for later readers.
    pub async fn bytes(&self, limit: usize) -> Result<Bytes, BodyError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, BodyState::Streaming) {
            BodyState::Pending(body) => {
                let bytes = axum::body::to_bytes(body, limit)
                    .await
                    .map_err(BodyError::Read)?;
                *state = BodyState::Buffered(bytes.clone());
                Ok(bytes)
            }
            BodyState::Buffered(bytes) => {
                *state = BodyState::Buffered(bytes.clone());
                Ok(bytes)
            }
            BodyState::Empty => {
                *state = BodyState::Empty;
                Ok(Bytes::new())
            }
            BodyState::Streaming => Err(BodyError::AlreadyConsumed),
        }
    }

    /// Take the body as a stream. Only the first taker gets an unread stream.
    pub async fn into_stream(&self) -> Result<Body, BodyError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, BodyState::Streaming) {
            BodyState::Pending(body) => Ok(body),
            BodyState::Buffered(bytes) => {
                *state = BodyState::Buffered(bytes.clone());
                Ok(Body::from(bytes))
            }
            BodyState::Empty => {
                *state = BodyState::Empty;
                Ok(Body::empty())
            }
            BodyState::Streaming => Err(BodyError::AlreadyConsumed),
        }
    }

    /// Returns true once the stream has been taken (or a read failed midway).
    pub async fn is_consumed(&self) -> bool {
        matches!(*self.state.lock().await, BodyState::Streaming)
    }

    /// Returns true once the body has been read into memory.
    pub async fn is_buffered(&self) -> bool {
        matches!(*self.state.lock().await, BodyState::Buffered(_))
    }

    /// Handle for an isolated copy of a request.
    ///
    /// An unread stream is shared by handle and not read. Buffered bytes are
    /// copied into a fresh handle. A consumed body stays consumed.
    pub async fn detach(&self) -> Self {
        let state = self.state.lock().await;
        match &*state {
            BodyState::Pending(_) => self.clone(),
            BodyState::Buffered(bytes) => Self::from_bytes(bytes.clone()),
            BodyState::Empty => Self::empty(),
            BodyState::Streaming => Self::with_state(BodyState::Streaming),
        }
    }

    /// An `axum` body that reads through this handle only when polled.
    ///
    /// Polling a consumed handle yields `BodyError::AlreadyConsumed`, so
    /// extractors fail instead of seeing an empty body.
    pub fn lazy_body(&self, limit: usize) -> Body {
        let handle = self.clone();
        Body::from_stream(futures_util::stream::once(async move {
            handle.bytes(limit).await
        }))
    }

    /// Returns true if both handles share the same underlying body.
    pub fn same_handle(&self, other: &RequestBody) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state.try_lock() {
            Ok(state) => match &*state {
                BodyState::Empty => "empty",
                BodyState::Pending(_) => "pending",
                BodyState::Buffered(_) => "buffered",
                BodyState::Streaming => "consumed",
            },
            Err(_) => "busy",
        };
        f.debug_struct("RequestBody").field("state", &state).finish()
    }
}
