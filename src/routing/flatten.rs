//! Route tree flattening and route key encoding.
//!
//! # Responsibilities
//! - Walk the route tree depth-first in insertion order
//! - Produce one `FlattenedRoute` per (path, method)
//! - Encode each route as a key that alone regenerates both the dispatch
//!   fragment and the parameter-extraction pattern
//! - Reject malformed trees before any traffic is served
//!
//! # Key Format
//! ```text
//! hello/:name  +  POST   →   hello____COLON_name___POST
//! (root)       +  GET    →   ___GET
//! ```
//! Segments are joined by `___`; a parameter segment's leading `:` becomes
//! `_COLON_`. Segments therefore may not contain `___` or `_COLON_`, and may
//! not start or end with `_`, or the key would not split back unambiguously.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use crate::routing::definition::RouteDefinition;
use crate::routing::error::RouteError;
use crate::routing::matcher::DispatchMatcher;
use crate::routing::method::Method;
use crate::routing::path::{self, DELIMITER};
use crate::routing::tree::RouteNode;

/// Separator between encoded segments in a route key.
pub const KEY_SEPARATOR: &str = "___";

/// Marker replacing the `:` of a parameter segment in a route key.
pub const PARAM_MARKER: &str = "_COLON_";

/// Prefix marking a parameter segment in a route path.
pub const PARAM_PREFIX: char = ':';

/// Matches one path segment, never crossing a delimiter.
pub(crate) const SEGMENT_WILDCARD: &str = "[^/]+";

/// One decoded segment of a route key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySegment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

/// One (path, method) entry of the flattened route table.
#[derive(Debug, Clone)]
pub struct FlattenedRoute {
    key: String,
    path: String,
    method: Method,
    params: Vec<String>,
    param_regex: Regex,
    definition: Arc<RouteDefinition>,
}

impl FlattenedRoute {
    fn new(path: &str, method: Method, definition: RouteDefinition) -> Result<Self, RouteError> {
        let path = path::normalize(path);
        let mut params: Vec<String> = Vec::new();

        for segment in path::split_segments(&path) {
            match segment.strip_prefix(PARAM_PREFIX) {
                Some(name) => {
                    if !is_valid_param(name) {
                        return Err(RouteError::InvalidParam {
                            path: display_path(&path),
                            param: name.to_string(),
                        });
                    }
                    if params.iter().any(|p| p == name) {
                        return Err(RouteError::DuplicateParam {
                            path: display_path(&path),
                            param: name.to_string(),
                        });
                    }
                    params.push(name.to_string());
                }
                None => check_literal(segment)?,
            }
        }

        let key = route_key(&path, method);
        let pattern = param_pattern(&key).ok_or_else(|| RouteError::MalformedKey(key.clone()))?;
        let param_regex = Regex::new(&pattern)?;

        Ok(Self {
            key,
            path,
            method,
            params,
            param_regex,
            definition: Arc::new(definition),
        })
    }

    /// Canonical route key, also the key of the introspection schema.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Canonical path, e.g. `hello/:name`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Parameter names in path order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Route-specific extraction pattern, regenerated from the key.
    pub fn param_regex(&self) -> &Regex {
        &self.param_regex
    }

    pub fn definition(&self) -> &Arc<RouteDefinition> {
        &self.definition
    }
}

/// Flatten a route tree into its route table and compiled dispatch matcher.
pub fn flatten(tree: RouteNode) -> Result<(Vec<FlattenedRoute>, DispatchMatcher), RouteError> {
    let mut routes = Vec::new();
    let mut seen = HashSet::new();
    walk(tree, "", &mut routes, &mut seen)?;

    let matcher = DispatchMatcher::compile(&routes)?;

    tracing::debug!(
        routes = routes.len(),
        "Route tree flattened"
    );

    Ok((routes, matcher))
}

fn walk(
    node: RouteNode,
    parent: &str,
    out: &mut Vec<FlattenedRoute>,
    seen: &mut HashSet<String>,
) -> Result<(), RouteError> {
    match node {
        RouteNode::Methods(defs) => {
            if defs.is_empty() {
                return Err(RouteError::EmptyMethods(display_path(parent)));
            }
            let mut methods = HashSet::new();
            for (method, def) in defs {
                if !methods.insert(method) {
                    return Err(RouteError::DuplicateMethod {
                        path: display_path(parent),
                        method: method.to_string(),
                    });
                }
                let route = FlattenedRoute::new(parent, method, def)?;
                if !seen.insert(route.key.clone()) {
                    return Err(RouteError::DuplicateRoute(route.key));
                }
                out.push(route);
            }
        }
        RouteNode::Segments(children) => {
            for (segment, child) in children {
                walk(child, &path::join(parent, &segment), out, seen)?;
            }
        }
    }
    Ok(())
}

/// Encode a canonical path and method as a route key.
pub fn route_key(path: &str, method: Method) -> String {
    let mut key = path::split_segments(path)
        .map(|segment| match segment.strip_prefix(PARAM_PREFIX) {
            Some(name) => format!("{}{}", PARAM_MARKER, name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR);
    key.push_str(KEY_SEPARATOR);
    key.push_str(method.as_str());
    key
}

/// Split a route key back into its segments and method.
pub fn decode_key(key: &str) -> Option<(Vec<KeySegment<'_>>, Method)> {
    let mut parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    let method = parts.pop()?.parse::<Method>().ok()?;
    let segments = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(|part| match part.strip_prefix(PARAM_MARKER) {
            Some(name) => KeySegment::Param(name),
            None => KeySegment::Literal(part),
        })
        .collect();
    Some((segments, method))
}

/// Dispatch fragment for a key: parameters become anonymous wildcards.
pub fn route_pattern(key: &str) -> Option<String> {
    render_pattern(key, |_| SEGMENT_WILDCARD.to_string())
}

/// Anchored extraction pattern for a key: one named group per parameter.
pub fn param_pattern(key: &str) -> Option<String> {
    render_pattern(key, |name| format!("(?P<{}>{})", name, SEGMENT_WILDCARD))
        .map(|pattern| format!("^{}$", pattern))
}

fn render_pattern(key: &str, param: impl Fn(&str) -> String) -> Option<String> {
    let (segments, method) = decode_key(key)?;
    let path = segments
        .iter()
        .map(|segment| match segment {
            KeySegment::Literal(literal) => regex::escape(literal),
            KeySegment::Param(name) => param(name),
        })
        .collect::<Vec<_>>()
        .join("/");
    Some(format!("{}{}{}", path, DELIMITER, method.as_str()))
}

fn check_literal(segment: &str) -> Result<(), RouteError> {
    let reserved = if segment.contains(KEY_SEPARATOR) {
        Some(KEY_SEPARATOR)
    } else if segment.contains(PARAM_MARKER) {
        Some(PARAM_MARKER)
    } else if segment.starts_with('_') || segment.ends_with('_') {
        Some("_")
    } else {
        None
    };
    match reserved {
        Some(reserved) => Err(RouteError::ReservedSequence {
            segment: segment.to_string(),
            reserved,
        }),
        None => Ok(()),
    }
}

fn is_valid_param(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.ends_with('_')
        && !name.contains(KEY_SEPARATOR)
}

fn display_path(path: &str) -> String {
    format!("{}{}", DELIMITER, path::normalize(path))
}
