//! Schema engine seam.
//!
//! The core never interprets schemas itself. It hands (schema, value) pairs
//! to a `SchemaEngine` and only distinguishes "value does not conform" from
//! "engine failed".

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;

/// Errors reported by a schema engine.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The value does not conform to the schema.
    #[error("{0}")]
    Mismatch(String),

    /// The engine could not perform the check (e.g. the schema itself is invalid).
    #[error("schema engine failure: {0}")]
    Engine(String),
}

/// A schema compiled once and checked against many values.
pub trait CompiledSchema: Send + Sync + fmt::Debug {
    fn validate(&self, value: &Value) -> Result<(), SchemaError>;
}

/// Compiles schemas for validation.
pub trait SchemaEngine: Send + Sync + fmt::Debug {
    /// An invalid schema is reported as `SchemaError::Engine`.
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, SchemaError>;

    /// One-off check; compiles `schema` on every call.
    fn validate(&self, schema: &Value, value: &Value) -> Result<(), SchemaError> {
        self.compile(schema)?.validate(value)
    }
}

/// JSON Schema engine backed by the `jsonschema` crate.
///
/// Compiled schemas are shared by their serialized form, so routes declaring
/// the same schema reuse one compilation.
#[derive(Default)]
pub struct JsonSchemaEngine {
    compiled: DashMap<String, Arc<JsonValidator>>,
}

impl JsonSchemaEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for JsonSchemaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaEngine")
            .field("cached_schemas", &self.compiled.len())
            .finish()
    }
}

impl SchemaEngine for JsonSchemaEngine {
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, SchemaError> {
        let cache_key = schema.to_string();
        if let Some(compiled) = self.compiled.get(&cache_key) {
            return Ok(compiled.clone());
        }

        let compiled = JSONSchema::compile(schema)
            .map(|schema| Arc::new(JsonValidator { schema }))
            .map_err(|e| SchemaError::Engine(e.to_string()))?;
        self.compiled.insert(cache_key, compiled.clone());
        Ok(compiled)
    }
}

/// A compiled JSON Schema.
pub struct JsonValidator {
    schema: JSONSchema,
}

impl fmt::Debug for JsonValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonValidator").finish_non_exhaustive()
    }
}

impl CompiledSchema for JsonValidator {
    fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let result = self.schema.validate(value).map_err(|errors| {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            SchemaError::Mismatch(messages.join("; "))
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"message": {"type": "string"}},
            "required": ["message"]
        })
    }

    #[test]
    fn test_accepts_conforming_value() {
        let engine = JsonSchemaEngine::new();
        assert!(engine.validate(&message_schema(), &json!({"message": "Hello"})).is_ok());
    }

    #[test]
    fn test_reports_mismatch() {
        let engine = JsonSchemaEngine::new();
        let err = engine
            .validate(&message_schema(), &json!({"message": 123}))
            .unwrap_err();
        match err {
            SchemaError::Mismatch(msg) => assert!(msg.contains("string"), "got {}", msg),
            other => panic!("expected mismatch, got {:?}", other),
        }

        let missing = engine.validate(&message_schema(), &Value::Null).unwrap_err();
        assert!(matches!(missing, SchemaError::Mismatch(_)));
    }

    #[test]
    fn test_invalid_schema_is_an_engine_failure() {
        let engine = JsonSchemaEngine::new();
        let err = engine
            .validate(&json!({"type": "no-such-type"}), &json!(1))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Engine(_)));
    }

    #[test]
    fn test_compiled_schema_is_reusable() {
        let engine = JsonSchemaEngine::new();
        let compiled = engine.compile(&message_schema()).unwrap();
        assert!(compiled.validate(&json!({"message": "a"})).is_ok());
        assert!(matches!(
            compiled.validate(&json!({"message": 1})),
            Err(SchemaError::Mismatch(_))
        ));
    }

    #[test]
    fn test_identical_schemas_share_a_compilation() {
        let engine = JsonSchemaEngine::new();
        let first = engine.compile(&message_schema()).unwrap();
        let second = engine.compile(&message_schema()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.compiled.len(), 1);
    }
}
