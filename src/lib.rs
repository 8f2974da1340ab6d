//! RPC-style routing and validation core.
//!
//! Handlers are declared as a tree of path segments and HTTP methods,
//! flattened into one compiled matcher, and served through an ordered
//! pipeline: introspection, resolution, start hook, authorization, schema
//! validation, handler, finish hook, response shaping.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod schema;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{FinishOutcome, Pipeline, PipelineOptions, RequestContext};
pub use routing::{HandlerInput, Method, RouteDefinition, RouteNode};
