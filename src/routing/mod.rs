//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteNode tree
//!     → flatten.rs (depth-first walk, route keys, construction errors)
//!     → matcher.rs (one anchored alternation, one group per route)
//!     → Freeze as immutable Router
//!
//! Incoming Request (path, method)
//!     → router.rs (route lookup)
//!     → matcher.rs (phase 1: which route; phase 2: path parameters)
//!     → Return: RouteMatch or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: earliest registered route wins, not the most specific
//! - Malformed trees are fatal at construction, never a runtime condition

pub mod definition;
pub mod error;
pub mod flatten;
pub mod matcher;
pub mod method;
pub mod path;
pub mod router;
pub mod tree;

pub use definition::{HandlerInput, PathParams, RouteDefinition, RouteDefinitionBuilder};
pub use error::RouteError;
pub use flatten::{flatten, FlattenedRoute};
pub use matcher::{DispatchMatcher, RouteMatch};
pub use method::Method;
pub use router::Router;
pub use tree::{RouteEntry, RouteNode};
