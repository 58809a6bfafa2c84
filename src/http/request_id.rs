//! Per-request correlation id.
//!
//! The id is taken from an inbound `x-request-id` header when present,
//! otherwise generated (UUID v4). It lives in request extensions and the
//! request's tracing span only; outbound and client headers are untouched.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::fmt;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_request(request: &Request<Body>) -> Self {
        request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access the id assigned by [`assign_request_id`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Middleware storing a [`RequestId`] in the request extensions.
pub async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = RequestId::from_request(&request);
    request.extensions_mut().insert(id);
    next.run(request).await
}
