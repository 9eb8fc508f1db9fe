//! Conversion between `http` requests and request contexts.
//!
//! # Responsibilities
//! - Capture every bridged field of an inbound `Request<Body>`
//! - Render a context back into a `Request<Body>` for a router pipeline
//!
//! # Design Decisions
//! - The rendered request uses origin-form (`path?query`); the Host header
//!   carries the authority
//! - The rendered body reads through the context's body handle lazily
//! - Path base, route values, body handle and cancellation token travel as
//!   request extensions

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::uri::InvalidUri;
use axum::http::{Request, Uri};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::context::{Cookies, Params, RequestBody, RequestContext, RouteValues};

/// Errors turning a context back into a request.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid request target `{target}`: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: InvalidUri,
    },
}

/// Path base of the mount a request was dispatched through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathBase(pub String);

impl RequestContext {
    /// Capture an inbound request.
    pub fn from_request(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();

        let scheme = parts.uri.scheme_str().unwrap_or("http").to_string();
        let host = parts
            .uri
            .authority()
            .map(|a| a.to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(HOST)
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string)
            });
        let path = parts.uri.path().to_string();
        let query_string = parts.uri.query().map(str::to_string);
        let query = query_string
            .as_deref()
            .map(|q| Params::parse(q.as_bytes()))
            .unwrap_or_default();
        let raw_target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());
        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let cookies = Cookies::from_headers(&parts.headers);
        let route_values = parts
            .extensions
            .get::<RouteValues>()
            .cloned()
            .unwrap_or_default();
        // Set when this host is itself mounted under another one.
        let path_base = parts
            .extensions
            .get::<PathBase>()
            .map(|base| base.0.clone())
            .unwrap_or_default();

        Self {
            method: parts.method,
            scheme,
            host,
            raw_target,
            path_base,
            path,
            query_string,
            query,
            protocol: parts.version,
            headers: parts.headers,
            cookies,
            content_length,
            content_type,
            body: RequestBody::new(body),
            route_values,
            cancellation: CancellationToken::new(),
        }
    }

    /// Render this context as a request for an `axum` pipeline.
    ///
    /// The body is not read here; it is pulled through the handle when the
    /// pipeline polls it, up to `body_limit` bytes.
    pub fn render_request(&self, body_limit: usize) -> Result<Request<Body>, ContextError> {
        let target = match &self.query_string {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        };
        let uri = target
            .parse::<Uri>()
            .map_err(|source| ContextError::InvalidTarget {
                target: target.clone(),
                source,
            })?;

        let mut request = Request::new(self.body.lazy_body(body_limit));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = uri;
        *request.version_mut() = self.protocol;
        *request.headers_mut() = self.headers.clone();

        let extensions = request.extensions_mut();
        extensions.insert(PathBase(self.path_base.clone()));
        extensions.insert(self.route_values.clone());
        extensions.insert(self.body.clone());
        extensions.insert(self.cancellation.clone());

        Ok(request)
    }
}
