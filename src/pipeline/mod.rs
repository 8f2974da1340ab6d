//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! TransportRequest (any server)
//!     → orchestrator.rs (introspection, resolution, hooks, auth, validation)
//!     → query.rs (query string → object)
//!     → routing (route + path parameters)
//!     → schema engine (query, then body)
//!     → handler
//!     → outcome.rs (shape into PipelineResponse)
//!     → transport emits it
//! ```
//!
//! # Design Decisions
//! - Transport-agnostic: the axum adapter lives in `http`, tests use
//!   `BufferedRequest`
//! - One `RequestContext` per request, shared by `Arc` with every hook

pub mod context;
pub mod orchestrator;
pub mod outcome;
pub mod query;
pub mod transport;

pub use context::{RequestContext, RequestHead};
pub use orchestrator::{Pipeline, PipelineOptions};
pub use outcome::{shape_response, FinishOutcome, InputField, PipelineError, PipelineResponse};
pub use query::parse_query;
pub use transport::{BufferedRequest, TransportRequest};
