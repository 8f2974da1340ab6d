//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, limits and the introspection path
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("routing.schema_path must start with '/' and name a path, got {0:?}")]
    InvalidSchemaPath(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.log_level: unknown level {0:?}")]
    UnknownLogLevel(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let schema_path = &config.routing.schema_path;
    if !schema_path.starts_with('/') || schema_path.trim_matches('/').is_empty() {
        errors.push(ValidationError::InvalidSchemaPath(schema_path.clone()));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("limits.request_timeout_secs"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
