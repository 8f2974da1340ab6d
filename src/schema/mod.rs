//! Schemas: introspection aggregation and the validation engine seam.

pub mod aggregate;
pub mod engine;

pub use aggregate::{aggregate, RouteSchema, Schema};
pub use engine::{CompiledSchema, JsonSchemaEngine, JsonValidator, SchemaEngine, SchemaError};
