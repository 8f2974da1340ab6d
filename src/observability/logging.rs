//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from config
//! - Let `RUST_LOG` override the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Pretty format for development, compact for log shipping

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter directives derived from config, used when `RUST_LOG` is unset.
pub fn default_directives(config: &ObservabilityConfig) -> String {
    let level = config.log_level.to_ascii_lowercase();
    format!("somnolence={level},tower_http={level}")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    }
}
