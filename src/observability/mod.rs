//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters and latency histograms)
//!
//! Consumers:
//!     → stdout (pretty or compact)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the request span (see `http::request`)
//! - Metrics are optional and off by default

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
