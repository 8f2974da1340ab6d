//! Pipeline outcomes: failures, what the finish hook observes, and the
//! shaped response handed back to the transport.

use std::fmt;

use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::ResponseEnvelope;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Which request input failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Query,
    Body,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputField::Query => f.write_str("query"),
            InputField::Body => f.write_str("body"),
        }
    }
}

/// Failures the pipeline turns into responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Route not found: {path}")]
    RouteNotFound { path: String },

    #[error("Not Authorized")]
    Unauthorized,

    #[error("Invalid {field}: {message}")]
    ValidationFailed { field: InputField, message: String },

    /// Anything unexpected. The message reaches the client verbatim.
    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::Unauthorized => StatusCode::UNAUTHORIZED,
            PipelineError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn internal(err: impl fmt::Display) -> Self {
        PipelineError::Internal(err.to_string())
    }
}

/// What a finish hook observes.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishOutcome {
    /// The handler's output.
    Response(Value),
    /// The request was turned away before or instead of the handler.
    Rejected { status: StatusCode, message: String },
}

impl FinishOutcome {
    pub(crate) fn rejected(err: &PipelineError) -> Self {
        FinishOutcome::Rejected {
            status: err.status(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FinishOutcome::Response(_))
    }

    /// The handler output, or the rejection message as a string value.
    pub fn as_value(&self) -> Value {
        match self {
            FinishOutcome::Response(value) => value.clone(),
            FinishOutcome::Rejected { message, .. } => Value::String(message.clone()),
        }
    }
}

/// A fully shaped response, ready for any transport to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
    /// Route key that produced this response, when one was resolved.
    pub route: Option<String>,
}

impl PipelineResponse {
    /// Plain-text error response carrying the failure message.
    pub fn from_error(err: &PipelineError) -> Self {
        Self {
            status: err.status(),
            content_type: CONTENT_TYPE_TEXT,
            body: Bytes::from(err.to_string()),
            route: None,
        }
    }

    pub(crate) fn with_route(mut self, route: &str) -> Self {
        self.route = Some(route.to_string());
        self
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Shape a handler output (or the introspection schema) as a 200 response.
///
/// Objects and arrays become JSON, bare or enveloped. Strings are written
/// raw; numbers and booleans as their JSON text; null as an empty body.
pub fn shape_response(
    value: Value,
    envelope: ResponseEnvelope,
) -> Result<PipelineResponse, PipelineError> {
    let (content_type, body) = match value {
        Value::Object(_) | Value::Array(_) => {
            let payload = match envelope {
                ResponseEnvelope::Bare => value,
                ResponseEnvelope::Wrapped => json!({ "response": value }),
            };
            let bytes = serde_json::to_vec(&payload).map_err(PipelineError::internal)?;
            (CONTENT_TYPE_JSON, Bytes::from(bytes))
        }
        Value::String(text) => (CONTENT_TYPE_TEXT, Bytes::from(text)),
        Value::Null => (CONTENT_TYPE_TEXT, Bytes::new()),
        scalar => (CONTENT_TYPE_TEXT, Bytes::from(scalar.to_string())),
    };

    Ok(PipelineResponse {
        status: StatusCode::OK,
        content_type,
        body,
        route: None,
    })
}
