//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Own the flattened route table and its compiled matcher
//! - Look up the route for a request path and method
//! - Return a matched route or an explicit no-match
//!
//! # Design Decisions
//! - Built once from the route tree, immutable afterwards (no hot reload)
//! - Shared via `Arc`; concurrent lookups need no locking

use std::sync::Arc;

use crate::routing::error::RouteError;
use crate::routing::flatten::{flatten, FlattenedRoute};
use crate::routing::matcher::{DispatchMatcher, RouteMatch};
use crate::routing::method::Method;
use crate::routing::tree::RouteNode;

/// Compiled, read-only routing table.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Arc<[FlattenedRoute]>,
    matcher: Arc<DispatchMatcher>,
}

impl Router {
    /// Flatten and compile a route tree. Malformed trees are rejected here.
    pub fn new(tree: RouteNode) -> Result<Self, RouteError> {
        let (routes, matcher) = flatten(tree)?;
        for route in &routes {
            tracing::debug!(
                route = %route.key(),
                method = %route.method(),
                path = %route.path(),
                "Route registered"
            );
        }
        Ok(Self {
            routes: routes.into(),
            matcher: Arc::new(matcher),
        })
    }

    pub fn routes(&self) -> &[FlattenedRoute] {
        &self.routes
    }

    pub fn matcher(&self) -> &DispatchMatcher {
        &self.matcher
    }

    /// Find the route for `path` and `method`.
    pub fn find(&self, path: &str, method: &str) -> Option<RouteMatch<'_>> {
        self.matcher.find(&self.routes, path, method)
    }

    /// Routes registered for `path` under any method, in insertion order.
    pub fn siblings(&self, path: &str) -> Vec<&FlattenedRoute> {
        let mut indices: Vec<usize> = Method::ALL
            .into_iter()
            .filter_map(|method| self.matcher.identify(path, method.as_str()))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .filter_map(|idx| self.routes.get(idx))
            .collect()
    }
}
