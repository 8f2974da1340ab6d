//! Transport adapter seam.
//!
//! The pipeline never inspects which server it runs in. Whatever accepted the
//! connection hands it a `TransportRequest`; the pipeline hands back a
//! `PipelineResponse` for the transport to emit.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::HeaderMap;
use tower::BoxError;

/// What the pipeline needs from an inbound request.
#[async_trait]
pub trait TransportRequest: Send {
    fn method(&self) -> &str;

    /// Request path without the query string.
    fn path(&self) -> &str;

    /// Raw query string without the leading `?`, if any.
    fn query(&self) -> Option<&str>;

    fn headers(&self) -> &HeaderMap;

    /// Read the full request body. Called at most once.
    async fn read_body(&mut self) -> Result<Bytes, BoxError>;
}

/// A request held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedRequest {
    method: String,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl BufferedRequest {
    /// Build from a method and a path that may carry a query string.
    pub fn new(method: impl Into<String>, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method: method.into(),
            path,
            query,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_body(value.to_string())
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }
}

#[async_trait]
impl TransportRequest for BufferedRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    async fn read_body(&mut self) -> Result<Bytes, BoxError> {
        Ok(std::mem::take(&mut self.body))
    }
}
