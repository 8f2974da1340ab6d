//! The route tree supplied at construction.
//!
//! # Design Decisions
//! - Node kind is an explicit tag, not inferred from key names
//! - Children keep insertion order; the flattener walks them in that order
//! - `from_entries` is the only place keys are sniffed, and it refuses to
//!   mix method keys with segment keys

use crate::routing::definition::RouteDefinition;
use crate::routing::error::RouteError;
use crate::routing::method::Method;

/// One level of the route tree.
#[derive(Debug, Clone)]
pub enum RouteNode {
    /// Terminal node: method → definition.
    Methods(Vec<(Method, RouteDefinition)>),
    /// Path node: segment (possibly several `/`-separated segments, or empty)
    /// → child node.
    Segments(Vec<(String, RouteNode)>),
}

/// A child entry before its node kind is known.
#[derive(Debug, Clone)]
pub enum RouteEntry {
    Definition(RouteDefinition),
    Node(RouteNode),
}

impl From<RouteDefinition> for RouteEntry {
    fn from(def: RouteDefinition) -> Self {
        RouteEntry::Definition(def)
    }
}

impl From<RouteNode> for RouteEntry {
    fn from(node: RouteNode) -> Self {
        RouteEntry::Node(node)
    }
}

impl RouteNode {
    /// An empty terminal node.
    pub fn methods() -> Self {
        RouteNode::Methods(Vec::new())
    }

    /// An empty path node.
    pub fn segments() -> Self {
        RouteNode::Segments(Vec::new())
    }

    /// Attach a definition for `method`.
    ///
    /// On a path node the definition goes under the empty segment, so
    /// `segments().get(a).route(":id", b)` serves both `GET /` and `GET /:id`.
    pub fn method(mut self, method: Method, def: RouteDefinition) -> Self {
        match &mut self {
            RouteNode::Methods(defs) => defs.push((method, def)),
            RouteNode::Segments(children) => {
                let own = children
                    .iter()
                    .position(|(segment, node)| segment.is_empty() && node.is_terminal());
                match own {
                    Some(idx) => {
                        if let RouteNode::Methods(defs) = &mut children[idx].1 {
                            defs.push((method, def));
                        }
                    }
                    None => children.push((String::new(), RouteNode::Methods(vec![(method, def)]))),
                }
            }
        }
        self
    }

    pub fn get(self, def: RouteDefinition) -> Self {
        self.method(Method::Get, def)
    }

    pub fn post(self, def: RouteDefinition) -> Self {
        self.method(Method::Post, def)
    }

    pub fn put(self, def: RouteDefinition) -> Self {
        self.method(Method::Put, def)
    }

    pub fn patch(self, def: RouteDefinition) -> Self {
        self.method(Method::Patch, def)
    }

    pub fn delete(self, def: RouteDefinition) -> Self {
        self.method(Method::Delete, def)
    }

    /// Attach a child under `segment`. A terminal node is first moved under
    /// the empty segment.
    pub fn route(self, segment: impl Into<String>, child: RouteNode) -> Self {
        match self {
            RouteNode::Segments(mut children) => {
                children.push((segment.into(), child));
                RouteNode::Segments(children)
            }
            terminal @ RouteNode::Methods(_) => {
                RouteNode::Segments(vec![(String::new(), terminal), (segment.into(), child)])
            }
        }
    }

    /// Build a node from untyped keys, sniffing whether it is terminal.
    ///
    /// A node is terminal when every key is a method name and every entry is
    /// a definition. Any mix of the two kinds is rejected.
    pub fn from_entries<I, K>(entries: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (K, RouteEntry)>,
        K: Into<String>,
    {
        let entries: Vec<(String, RouteEntry)> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();

        let (method_keys, segment_keys): (Vec<_>, Vec<_>) = entries
            .iter()
            .map(|(k, entry)| (k.as_str(), entry))
            .partition(|(k, entry)| {
                Method::is_method_name(k) && matches!(entry, RouteEntry::Definition(_))
            });

        if !method_keys.is_empty() && !segment_keys.is_empty() {
            return Err(RouteError::MixedNode {
                path: String::new(),
                methods: method_keys.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(", "),
                segments: segment_keys.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(", "),
            });
        }

        if segment_keys.is_empty() && !method_keys.is_empty() {
            let mut defs = Vec::with_capacity(entries.len());
            for (key, entry) in entries {
                if let (Ok(method), RouteEntry::Definition(def)) = (key.parse::<Method>(), entry) {
                    defs.push((method, def));
                }
            }
            return Ok(RouteNode::Methods(defs));
        }

        let mut children = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match entry {
                RouteEntry::Node(node) => children.push((key, node)),
                // A definition under a non-method key has no method to bind to.
                RouteEntry::Definition(_) => {
                    return Err(RouteError::MixedNode {
                        path: key.clone(),
                        methods: String::new(),
                        segments: key,
                    })
                }
            }
        }
        Ok(RouteNode::Segments(children))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteNode::Methods(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def() -> RouteDefinition {
        RouteDefinition::builder()
            .response(json!({"type": "string"}))
            .handler_fn(|_| "ok")
            .build()
            .unwrap()
    }

    #[test]
    fn test_from_entries_terminal() {
        let node = RouteNode::from_entries([
            ("GET", RouteEntry::Definition(def())),
            ("POST", RouteEntry::Definition(def())),
        ]).unwrap();
        match node {
            RouteNode::Methods(defs) => {
                let methods: Vec<_> = defs.iter().map(|(m, _)| *m).collect();
                assert_eq!(methods, vec![Method::Get, Method::Post]);
            }
            RouteNode::Segments(_) => panic!("expected terminal node"),
        }
    }

    #[test]
    fn test_from_entries_path_node() {
        let child = RouteNode::methods().get(def());
        let node = RouteNode::from_entries([("/hello", RouteEntry::Node(child))]).unwrap();
        assert!(!node.is_terminal());
    }

    #[test]
    fn test_builder_places_own_methods_under_empty_segment() {
        let node = RouteNode::segments()
            .get(def())
            .route(":name", RouteNode::methods().get(def()))
            .post(def());
        match node {
            RouteNode::Segments(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0].0, "");
                match &children[0].1 {
                    RouteNode::Methods(defs) => assert_eq!(defs.len(), 2),
                    RouteNode::Segments(_) => panic!("expected terminal child"),
                }
            }
            RouteNode::Methods(_) => panic!("expected path node"),
        }
    }

    #[test]
    fn test_from_entries_rejects_mixed_node() {
        let child = RouteNode::methods().get(def());
        let err = RouteNode::from_entries([
            ("GET", RouteEntry::Definition(def())),
            (":name", RouteEntry::Node(child)),
        ])
        .unwrap_err();
        assert!(matches!(err, RouteError::MixedNode { .. }));
        assert!(err.to_string().contains(":name"));
    }

    #[test]
    fn test_from_entries_rejects_definition_under_segment() {
        let err = RouteNode::from_entries([("hello", RouteEntry::Definition(def()))]).unwrap_err();
        assert!(matches!(err, RouteError::MixedNode { .. }));
    }
}
