//! Introspection schema aggregation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::routing::FlattenedRoute;

/// Declared schemas of one route. Absent optional schemas are left out of
/// the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub response: Value,
}

/// Route key → declared schemas, sorted by route key.
pub type Schema = BTreeMap<String, RouteSchema>;

/// Project every flattened route onto its declared schemas.
pub fn aggregate(routes: &[FlattenedRoute]) -> Schema {
    routes
        .iter()
        .map(|route| {
            let def = route.definition();
            let entry = RouteSchema {
                query: def.query_schema().cloned(),
                body: def.body_schema().cloned(),
                response: def.response_schema().clone(),
            };
            (route.key().to_string(), entry)
        })
        .collect()
}
