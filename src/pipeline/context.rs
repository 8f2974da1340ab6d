//! Per-request context shared with hooks and authorizers.

use axum::http::HeaderMap;
use serde_json::Value;

use crate::routing::{HandlerInput, PathParams};

/// Transport-level view of the inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestHead {
    pub method: String,
    /// Path as received, without the query string.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    pub headers: HeaderMap,
}

/// Everything known about a request once its route is resolved.
///
/// Built once per request and shared by `Arc` with the start hook, the
/// authorizer and the finish hook.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request: RequestHead,
    /// Route key of the resolved route.
    pub route: String,
    pub params: PathParams,
    /// Parsed query object.
    pub query: Value,
    /// Parsed JSON body, `Null` when empty or malformed.
    pub body: Value,
}

impl RequestContext {
    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Bearer token from the `Authorization` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
    }

    pub(crate) fn handler_input(&self) -> HandlerInput {
        HandlerInput {
            params: self.params.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        let mut ctx = RequestContext::default();
        assert_eq!(ctx.bearer_token(), None);

        ctx.request
            .headers
            .insert("authorization", "Bearer s3cret".parse().unwrap());
        assert_eq!(ctx.bearer_token(), Some("s3cret"));

        ctx.request
            .headers
            .insert("authorization", "Basic abc".parse().unwrap());
        assert_eq!(ctx.bearer_token(), None);
    }
}
