//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Routing settings (introspection path).
    pub routing: RoutingConfig,

    /// Request size and time limits.
    pub limits: LimitsConfig,

    /// Response shaping.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path serving the aggregated route schemas.
    pub schema_path: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            schema_path: "/__schema".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            request_timeout_secs: 30,
        }
    }
}

/// How structured handler output is written to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEnvelope {
    /// The value itself.
    #[default]
    Bare,
    /// `{"response": value}`.
    Wrapped,
}

/// Response configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResponseConfig {
    pub envelope: ResponseEnvelope,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.routing.schema_path, "/__schema");
        assert_eq!(config.limits.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.limits.request_timeout_secs, 30);
        assert_eq!(config.response.envelope, ResponseEnvelope::Bare);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [response]
            envelope = "wrapped"

            [observability]
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.response.envelope, ResponseEnvelope::Wrapped);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.metrics_address, "0.0.0.0:9090");
        assert_eq!(config.routing.schema_path, "/__schema");
    }

    #[test]
    fn test_unknown_envelope_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[response]\nenvelope = \"boxed\"\n");
        assert!(result.is_err());
    }
}
