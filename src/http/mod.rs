//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (request ID, AxumRequest adapter, body limit)
//!     → pipeline (resolve, hooks, validation, handler)
//!     → response.rs (PipelineResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{AxumRequest, MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
