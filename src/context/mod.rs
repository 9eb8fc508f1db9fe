//! Request context subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound Request<Body>
//!     → convert.rs (capture method, target, headers, cookies, body handle)
//!     → RequestContext (owned by one dispatch)
//!     → rebase (strip mount prefix into path_base)
//!     → [alias: same value | clone: isolated_clone()]
//!     → convert.rs (render Request<Body> for the mounted pipeline)
//! ```
//!
//! # Design Decisions
//! - One plain struct with named fields; no facet lookup by type
//! - Body is a lazily-read capability (body.rs), never pre-parsed
//! - Header map keeps every value of a name, in arrival order

pub mod body;
pub mod convert;
pub mod params;

use axum::http::header::HeaderMap;
use axum::http::{HeaderName, Method, Version};
use tokio_util::sync::CancellationToken;

use crate::routing::PathPrefix;

pub use body::{BodyError, RequestBody};
pub use convert::{ContextError, PathBase};
pub use params::{Cookies, Params, RouteValues};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Observable state of one inbound request.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub scheme: String,
    pub host: Option<String>,
    /// Request target exactly as received; never rewritten.
    pub raw_target: String,
    pub path_base: String,
    pub path: String,
    /// Query string without the leading `?`.
    pub query_string: Option<String>,
    pub query: Params,
    pub protocol: Version,
    pub headers: HeaderMap,
    pub cookies: Cookies,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: RequestBody,
    pub route_values: RouteValues,
    /// Fires when the inbound request is abandoned (client disconnect,
    /// request timeout). Host shutdown drains instead of firing it.
    pub cancellation: CancellationToken,
}

impl RequestContext {
    /// Move `prefix` from `path` into `path_base`.
    ///
    /// Returns false (and leaves the context untouched) if the prefix does
    /// not cover whole segments of the path. An exact match leaves `/`.
    pub fn rebase(&mut self, prefix: &PathPrefix) -> bool {
        let Some(rest) = prefix.strip(&self.path) else {
            return false;
        };
        let rest = if rest.is_empty() { "/" } else { rest }.to_string();

        self.path_base.push_str(prefix.as_str());
        self.path = rest;
        true
    }

    /// Copy every field into a new, independent context.
    ///
    /// Headers are copied pair by pair so each name keeps all of its values
    /// in order. The body handle is detached without reading the stream, see
    /// [`RequestBody::detach`]. The cancellation token is shared.
    pub async fn isolated_clone(&self) -> RequestContext {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers.iter() {
            headers.append(name.clone(), value.clone());
        }

        RequestContext {
            method: self.method.clone(),
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            raw_target: self.raw_target.clone(),
            path_base: self.path_base.clone(),
            path: self.path.clone(),
            query_string: self.query_string.clone(),
            query: self.query.clone(),
            protocol: self.protocol,
            headers,
            cookies: self.cookies.clone(),
            content_length: self.content_length,
            content_type: self.content_type.clone(),
            body: self.body.detach().await,
            route_values: self.route_values.clone(),
            cancellation: self.cancellation.clone(),
        }
    }

    /// Value of the `x-request-id` header, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(HeaderName::from_static(crate::http::request::X_REQUEST_ID))
            .and_then(|v| v.to_str().ok())
    }

    /// Checks the content type only; the body is not touched.
    pub fn has_form_content_type(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
            .unwrap_or(false)
    }

    /// Parse a url-encoded form body. Reads the body on first call.
    pub async fn read_form(&self, limit: usize) -> Result<Params, BodyError> {
        if !self.has_form_content_type() {
            return Err(BodyError::NotForm);
        }
        let bytes = self.body.bytes(limit).await?;
        Ok(Params::parse(&bytes))
    }
}
