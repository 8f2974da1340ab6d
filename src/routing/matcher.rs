//! Route matching logic.
//!
//! # Responsibilities
//! - Compile every flattened route into one anchored alternation
//! - Identify the matched route from `"{path}/{method}"` in a single pass
//! - Extract path parameters with the route's own pattern
//!
//! # Design Decisions
//! - Path shape and method are tested jointly, so a path registered for other
//!   methods still misses
//! - Alternation order is route insertion order; the regex engine prefers the
//!   leftmost branch, so the earliest route wins when several could match
//! - Parameters are returned as strings; coercion belongs to the handler

use regex::{Regex, RegexBuilder};

use crate::routing::definition::PathParams;
use crate::routing::error::RouteError;
use crate::routing::flatten::{route_pattern, FlattenedRoute};
use crate::routing::method::Method;
use crate::routing::path::{self, DELIMITER};

/// Upper bound for the compiled alternation.
const MAX_DISPATCH_REGEX_SIZE: usize = 64 * (1 << 20);

/// A resolved route together with its extracted parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub key: &'a str,
    pub route: &'a FlattenedRoute,
    pub params: PathParams,
}

/// Single compiled pattern recognizing every flattened route.
#[derive(Debug, Clone)]
pub struct DispatchMatcher {
    regex: Regex,
    /// Capture group name per route, indexed like the route table.
    groups: Vec<String>,
}

impl DispatchMatcher {
    /// Compile the alternation for `routes`, one named group per route.
    pub fn compile(routes: &[FlattenedRoute]) -> Result<Self, RouteError> {
        let mut groups = Vec::with_capacity(routes.len());
        let mut fragments = Vec::with_capacity(routes.len());

        for (idx, route) in routes.iter().enumerate() {
            let fragment = route_pattern(route.key())
                .ok_or_else(|| RouteError::MalformedKey(route.key().to_string()))?;
            let group = format!("r{}", idx);
            fragments.push(format!("(?P<{}>{})", group, fragment));
            groups.push(group);
        }

        // An empty table compiles to a pattern that cannot match any
        // "{path}/{method}" subject.
        let source = format!("^(?:{})$", fragments.join("|"));
        let regex = RegexBuilder::new(&source)
            .size_limit(MAX_DISPATCH_REGEX_SIZE)
            .build()?;

        Ok(Self { regex, groups })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Phase 1: index of the route matching `path` and `method`.
    pub fn identify(&self, path: &str, method: &str) -> Option<usize> {
        let subject = subject(path, method);
        let captures = self.regex.captures(&subject)?;
        self.groups
            .iter()
            .position(|group| captures.name(group).is_some())
    }

    /// Resolve a request to a route and extract its parameters.
    pub fn find<'a>(
        &self,
        routes: &'a [FlattenedRoute],
        path: &str,
        method: &str,
    ) -> Option<RouteMatch<'a>> {
        let idx = self.identify(path, method)?;
        let route = routes.get(idx)?;

        // Phase 2: route-specific pattern, one named group per parameter.
        let subject = subject(path, method);
        let params = match route.param_regex().captures(&subject) {
            Some(captures) => route
                .params()
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
            None => PathParams::new(),
        };

        Some(RouteMatch {
            key: route.key(),
            route,
            params,
        })
    }

    /// Methods for which `path` resolves to a route, in canonical order.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|method| self.identify(path, method.as_str()).is_some())
            .collect()
    }
}

/// The string both phases match against.
fn subject(path: &str, method: &str) -> String {
    format!("{}{}{}", path::normalize(path), DELIMITER, method)
}
