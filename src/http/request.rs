//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) and carry it in the request span
//! - Adapt an axum request to the pipeline's `TransportRequest`
//! - Enforce the body size limit while reading
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body is read lazily: unresolved routes never touch it

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, Request};
use tower::BoxError;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

use crate::pipeline::TransportRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Issues a fresh UUID v4 for every request that lacks an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

/// Span wrapping one request, tagged with its ID.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// An axum request seen through the pipeline's transport seam.
pub struct AxumRequest {
    parts: Parts,
    body: Option<Body>,
    max_body_bytes: usize,
}

impl AxumRequest {
    pub fn new(request: Request<Body>, max_body_bytes: usize) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
            max_body_bytes,
        }
    }
}

#[async_trait]
impl TransportRequest for AxumRequest {
    fn method(&self) -> &str {
        self.parts.method.as_str()
    }

    fn path(&self) -> &str {
        self.parts.uri.path()
    }

    fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    async fn read_body(&mut self) -> Result<Bytes, BoxError> {
        match self.body.take() {
            Some(body) => Ok(axum::body::to_bytes(body, self.max_body_bytes).await?),
            None => Ok(Bytes::new()),
        }
    }
}
