//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber (HTTP server) stops accepting → drain → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
