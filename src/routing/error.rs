//! Route definition errors.
//!
//! Every variant describes a bug in the route tree itself. They surface while
//! the router is being built, never while serving requests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    /// A node holds both method keys and path segment keys.
    #[error("route node at '{path}' mixes method keys ({methods}) with path segments ({segments})")]
    MixedNode {
        path: String,
        methods: String,
        segments: String,
    },

    /// A terminal definition was built without a handler.
    #[error("route definition is missing a handler")]
    MissingHandler,

    /// A terminal definition was built without a response schema.
    #[error("route definition is missing a response schema")]
    MissingResponse,

    /// A terminal node with no methods.
    #[error("route node at '{0}' declares no methods")]
    EmptyMethods(String),

    #[error("method {method} declared twice for route '{path}'")]
    DuplicateMethod { path: String, method: String },

    /// Two positions in the tree flatten to the same route key.
    #[error("route '{0}' is defined more than once")]
    DuplicateRoute(String),

    /// A segment contains one of the sequences reserved for route keys.
    #[error("path segment '{segment}' contains reserved sequence '{reserved}'")]
    ReservedSequence { segment: String, reserved: &'static str },

    #[error("invalid path parameter '{param}' in route '{path}'")]
    InvalidParam { path: String, param: String },

    #[error("path parameter '{param}' appears more than once in route '{path}'")]
    DuplicateParam { path: String, param: String },

    /// A declared query or body schema the schema engine cannot compile.
    #[error("invalid {field} schema for route '{route}': {message}")]
    InvalidSchema {
        route: String,
        field: String,
        message: String,
    },

    #[error("route key '{0}' cannot be decoded")]
    MalformedKey(String),

    /// The compiled dispatch pattern was rejected by the regex engine.
    #[error("failed to compile route pattern: {0}")]
    Pattern(#[from] regex::Error),
}
